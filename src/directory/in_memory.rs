use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::directory::{Connection, ConnectionDirectory};
use crate::error::Result;
use crate::utils::current_epoch_seconds;

#[derive(Default)]
struct DirectoryState {
    connections: HashMap<String, Connection>,
    by_user: HashMap<String, BTreeSet<String>>,
}

impl DirectoryState {
    fn unindex(&mut self, connection: &Connection) {
        if let Some(ids) = self.by_user.get_mut(&connection.user_id) {
            ids.remove(&connection.connection_id);
            if ids.is_empty() {
                self.by_user.remove(&connection.user_id);
            }
        }
    }

    /// 清理过期记录，在写入时顺带执行
    fn prune_expired(&mut self, now: i64) {
        let expired: Vec<Connection> = self
            .connections
            .values()
            .filter(|connection| connection.is_expired_at(now))
            .cloned()
            .collect();
        for connection in expired {
            self.connections.remove(&connection.connection_id);
            self.unindex(&connection);
        }
    }
}

/// 进程内连接目录，用于本地开发和测试
#[derive(Default, Clone)]
pub struct InMemoryConnectionDirectory {
    inner: Arc<RwLock<DirectoryState>>,
}

impl InMemoryConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录数（包含上次写入之后才过期的记录）
    pub async fn len(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConnectionDirectory for InMemoryConnectionDirectory {
    async fn register(&self, connection: Connection) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.prune_expired(current_epoch_seconds());
        if let Some(previous) = guard.connections.remove(&connection.connection_id) {
            guard.unindex(&previous);
        }
        guard
            .by_user
            .entry(connection.user_id.clone())
            .or_default()
            .insert(connection.connection_id.clone());
        guard
            .connections
            .insert(connection.connection_id.clone(), connection);
        Ok(())
    }

    async fn remove(&self, connection_id: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        if let Some(previous) = guard.connections.remove(connection_id) {
            guard.unindex(&previous);
        }
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Connection>> {
        let now = current_epoch_seconds();
        let guard = self.inner.read().await;
        let Some(ids) = guard.by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| guard.connections.get(id))
            .filter(|connection| !connection.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<Connection>> {
        let now = current_epoch_seconds();
        let guard = self.inner.read().await;
        Ok(guard
            .connections
            .get(connection_id)
            .filter(|connection| !connection.is_expired_at(now))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chrono::Utc;

    fn connection(id: &str, user: &str) -> Connection {
        Connection::new(
            id.to_string(),
            user.to_string(),
            Some("10.0.0.1".to_string()),
            Utc::now().timestamp_millis(),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_register_then_find_by_user() {
        let directory = InMemoryConnectionDirectory::new();
        directory.register(connection("c1", "a@x.com")).await.unwrap();

        let found = directory.find_by_user("a@x.com").await.unwrap();
        let ids: Vec<_> = found.iter().map(|c| c.connection_id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_user_with_many_connections() {
        let directory = InMemoryConnectionDirectory::new();
        directory.register(connection("c1", "a@x.com")).await.unwrap();
        directory.register(connection("c2", "a@x.com")).await.unwrap();
        directory.register(connection("c3", "b@x.com")).await.unwrap();

        assert_eq!(directory.find_by_user("a@x.com").await.unwrap().len(), 2);
        assert_eq!(directory.find_by_user("b@x.com").await.unwrap().len(), 1);
        assert!(directory.find_by_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let directory = InMemoryConnectionDirectory::new();
        directory.register(connection("c1", "a@x.com")).await.unwrap();

        directory.remove("c1").await.unwrap();
        directory.remove("c1").await.unwrap();
        directory.remove("never-existed").await.unwrap();

        assert!(directory.find_by_user("a@x.com").await.unwrap().is_empty());
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_reregister_moves_index() {
        let directory = InMemoryConnectionDirectory::new();
        directory.register(connection("c1", "a@x.com")).await.unwrap();
        directory.register(connection("c1", "b@x.com")).await.unwrap();

        assert!(directory.find_by_user("a@x.com").await.unwrap().is_empty());
        assert_eq!(directory.find_by_user("b@x.com").await.unwrap().len(), 1);
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_connections_are_hidden() {
        let directory = InMemoryConnectionDirectory::new();
        let mut stale = connection("c1", "a@x.com");
        stale.expires_at = current_epoch_seconds() - 1;
        directory.register(stale).await.unwrap();
        directory.register(connection("c2", "a@x.com")).await.unwrap();

        let found = directory.find_by_user("a@x.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].connection_id, "c2");
        assert!(directory.get("c1").await.unwrap().is_none());
        assert!(directory.get("c2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_prunes_expired_connections() {
        let directory = InMemoryConnectionDirectory::new();
        let mut stale = connection("c1", "a@x.com");
        stale.expires_at = current_epoch_seconds() - 1;
        directory.register(stale).await.unwrap();
        assert_eq!(directory.len().await, 1);

        directory.register(connection("c2", "b@x.com")).await.unwrap();

        assert_eq!(directory.len().await, 1);
        let guard = directory.inner.read().await;
        assert!(!guard.by_user.contains_key("a@x.com"));
        assert!(guard.connections.contains_key("c2"));
    }
}
