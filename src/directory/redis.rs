use anyhow::Context;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info, warn};

use crate::directory::{Connection, ConnectionDirectory};
use crate::error::{ErrorCode, InfraResult, InfraResultExt, Result};
use crate::utils::current_epoch_seconds;

const CONNECTION_PREFIX: &str = "connection:";
const USER_CONNECTIONS_PREFIX: &str = "user_connections:";

/// 基于 Redis 的连接目录
///
/// - `connection:{id}`：连接记录 JSON，`EX` 为剩余存活时间
/// - `user_connections:{user}`：该用户的连接 ID 集合，过期时间随最新写入刷新
///
/// 写入和删除都在 `MULTI/EXEC` 中完成。
pub struct RedisConnectionDirectory {
    conn: ConnectionManager,
    namespace: Option<String>,
}

impl RedisConnectionDirectory {
    /// 建立共享连接，进程内所有调用复用同一个 `ConnectionManager`
    pub async fn connect(url: &str, namespace: Option<String>) -> InfraResult<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to open redis connection")?;
        info!(namespace = ?namespace, "redis connection directory ready");
        Ok(Self { conn, namespace })
    }

    fn prefixed(&self, key: String) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{key}"),
            None => key,
        }
    }

    fn connection_key(&self, connection_id: &str) -> String {
        self.prefixed(format!("{}{}", CONNECTION_PREFIX, connection_id))
    }

    fn user_set_key(&self, user_id: &str) -> String {
        self.prefixed(format!("{}{}", USER_CONNECTIONS_PREFIX, user_id))
    }

    fn decode(raw: &str) -> InfraResult<Connection> {
        serde_json::from_str(raw).context("invalid connection json")
    }

    /// 按 ID 对齐 `MGET` 结果，返回存活连接和已失效的集合成员
    ///
    /// 无法解码的记录只记日志并跳过，不影响同一用户的其他连接。
    fn collect_live(
        connection_ids: Vec<String>,
        payloads: Vec<Option<String>>,
        now: i64,
    ) -> (Vec<Connection>, Vec<String>) {
        let mut connections = Vec::with_capacity(connection_ids.len());
        let mut stale = Vec::new();
        for (connection_id, payload) in connection_ids.into_iter().zip(payloads) {
            let Some(raw) = payload else {
                stale.push(connection_id);
                continue;
            };
            match Self::decode(&raw) {
                Ok(connection) if !connection.is_expired_at(now) => connections.push(connection),
                Ok(_) => {}
                Err(err) => warn!(
                    connection_id = %connection_id,
                    error = %format!("{err:#}"),
                    "skipping undecodable connection record"
                ),
            }
        }
        (connections, stale)
    }

    async fn fetch_connection(&self, connection_id: &str) -> InfraResult<Option<Connection>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .get(self.connection_key(connection_id))
            .await
            .context("failed to get connection")?;
        payload.as_deref().map(Self::decode).transpose()
    }

    async fn persist(&self, connection: &Connection) -> InfraResult<()> {
        let ttl = connection.remaining_ttl_seconds(current_epoch_seconds());
        if ttl == 0 {
            anyhow::bail!("connection {} is already expired", connection.connection_id);
        }
        let previous = self.fetch_connection(&connection.connection_id).await?;
        let json = serde_json::to_string(connection).context("failed to encode connection json")?;
        let user_key = self.user_set_key(&connection.user_id);

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(previous) = previous.filter(|p| p.user_id != connection.user_id) {
            pipe.srem(self.user_set_key(&previous.user_id), &previous.connection_id)
                .ignore();
        }
        pipe.set_ex(self.connection_key(&connection.connection_id), json, ttl)
            .ignore()
            .sadd(&user_key, &connection.connection_id)
            .ignore()
            .expire(&user_key, i64::try_from(ttl).unwrap_or(i64::MAX))
            .ignore();

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .context("failed to write connection")?;
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> InfraResult<()> {
        let Some(existing) = self.fetch_connection(connection_id).await? else {
            debug!(connection_id = %connection_id, "connection already absent");
            return Ok(());
        };

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(self.connection_key(connection_id))
            .ignore()
            .srem(self.user_set_key(&existing.user_id), connection_id)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("failed to delete connection")?;
        Ok(())
    }

    async fn query_user(&self, user_id: &str) -> InfraResult<Vec<Connection>> {
        let mut conn = self.conn.clone();
        let key = self.user_set_key(user_id);
        let connection_ids: Vec<String> = conn
            .smembers(&key)
            .await
            .context("failed to fetch user connection ids")?;
        if connection_ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = connection_ids
            .iter()
            .map(|id| self.connection_key(id))
            .collect();
        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .context("failed to fetch user connections")?;

        let (connections, stale) =
            Self::collect_live(connection_ids, payloads, current_epoch_seconds());

        // 记录已过期但集合中仍有引用，顺手清理
        if !stale.is_empty() {
            let _: usize = conn
                .srem(&key, &stale)
                .await
                .context("failed to cleanup stale connection references")?;
        }

        Ok(connections)
    }
}

#[async_trait]
impl ConnectionDirectory for RedisConnectionDirectory {
    async fn register(&self, connection: Connection) -> Result<()> {
        self.persist(&connection)
            .await
            .into_notify(ErrorCode::DirectoryWriteFailed, "failed to register connection")?;
        info!(
            connection_id = %connection.connection_id,
            user_id = %connection.user_id,
            "connection stored in redis"
        );
        Ok(())
    }

    async fn remove(&self, connection_id: &str) -> Result<()> {
        self.delete(connection_id)
            .await
            .into_notify(ErrorCode::DirectoryDeleteFailed, "failed to remove connection")
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Connection>> {
        self.query_user(user_id)
            .await
            .into_notify(ErrorCode::DirectoryReadFailed, "failed to query user connections")
    }

    async fn get(&self, connection_id: &str) -> Result<Option<Connection>> {
        let now = current_epoch_seconds();
        let connection = self
            .fetch_connection(connection_id)
            .await
            .into_notify(ErrorCode::DirectoryReadFailed, "failed to fetch connection")?;
        Ok(connection.filter(|c| !c.is_expired_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chrono::{DateTime, Utc};

    fn encoded(id: &str, user: &str, at: DateTime<Utc>) -> String {
        let connection = Connection::new_at(
            id.to_string(),
            user.to_string(),
            None,
            at.timestamp_millis(),
            Duration::from_secs(3600),
            at,
        );
        serde_json::to_string(&connection).unwrap()
    }

    #[test]
    fn test_undecodable_record_is_skipped() {
        let now = Utc::now();
        let ids = vec!["c1".to_string(), "c2".to_string(), "c3".to_string()];
        let payloads = vec![
            Some(encoded("c1", "a@x.com", now)),
            Some("{broken".to_string()),
            Some(encoded("c3", "a@x.com", now)),
        ];

        let (live, stale) = RedisConnectionDirectory::collect_live(ids, payloads, now.timestamp());

        let ids: Vec<_> = live.iter().map(|c| c.connection_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert!(stale.is_empty());
    }

    #[test]
    fn test_missing_and_expired_records() {
        let now = Utc::now();
        let ids = vec!["c1".to_string(), "c2".to_string()];
        let payloads = vec![None, Some(encoded("c2", "a@x.com", now - chrono::Duration::hours(2)))];

        let (live, stale) = RedisConnectionDirectory::collect_live(ids, payloads, now.timestamp());

        assert!(live.is_empty());
        assert_eq!(stale, vec!["c1"]);
    }
}
