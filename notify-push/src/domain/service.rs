//! 通知扇出领域服务

use std::sync::Arc;

use notify_core::directory::ConnectionDirectory;
use notify_core::error::Result;
use tracing::{debug, info, warn};

use crate::domain::models::{DeliveryReport, NotificationDetail, PushPayload};
use crate::domain::repositories::ConnectionPusher;

/// 把一条通知推送到用户的所有存活连接
///
/// 只读取连接目录，不修改连接记录；单个连接推送失败不影响其余连接。
pub struct NotificationDispatcher {
    directory: Arc<dyn ConnectionDirectory>,
    pusher: Arc<dyn ConnectionPusher>,
}

impl NotificationDispatcher {
    pub fn new(directory: Arc<dyn ConnectionDirectory>, pusher: Arc<dyn ConnectionPusher>) -> Self {
        Self { directory, pusher }
    }

    pub async fn dispatch(&self, detail: &NotificationDetail) -> Result<DeliveryReport> {
        let connections = self.directory.find_by_user(&detail.user_id).await?;
        let payload = PushPayload::new(detail).to_bytes()?;
        let mut report = DeliveryReport::new(&detail.user_id);

        debug!(
            user_id = %detail.user_id,
            connections = connections.len(),
            payload_len = payload.len(),
            "dispatching notification"
        );

        for connection in connections {
            match self.pusher.push(&connection.connection_id, &payload).await {
                Ok(()) => report.delivered.push(connection.connection_id),
                Err(err) => {
                    warn!(
                        user_id = %detail.user_id,
                        connection_id = %connection.connection_id,
                        code = %err.code(),
                        reason = %err.reason(),
                        details = err.detail().unwrap_or_default(),
                        "push to connection failed"
                    );
                    report.failed.push(connection.connection_id);
                }
            }
        }

        info!(
            user_id = %report.user_id,
            attempted = report.attempted(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "notification dispatched"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use async_trait::async_trait;
    use notify_core::directory::{Connection, InMemoryConnectionDirectory};
    use notify_core::error::{ErrorCode, InfraResultExt, NotifyError};
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingPusher {
        sent: Mutex<Vec<(String, Value)>>,
        unreachable: Vec<String>,
    }

    #[async_trait]
    impl ConnectionPusher for RecordingPusher {
        async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<()> {
            if self.unreachable.iter().any(|id| id == connection_id) {
                return Err(NotifyError::new(ErrorCode::PushDeliveryFailed, "connection gone"));
            }
            let value = serde_json::from_slice(payload).unwrap();
            self.sent.lock().await.push((connection_id.to_string(), value));
            Ok(())
        }
    }

    struct UnreadableDirectory;

    #[async_trait]
    impl ConnectionDirectory for UnreadableDirectory {
        async fn register(&self, _connection: Connection) -> Result<()> {
            Ok(())
        }

        async fn remove(&self, _connection_id: &str) -> Result<()> {
            Ok(())
        }

        async fn find_by_user(&self, _user_id: &str) -> Result<Vec<Connection>> {
            Err(anyhow::anyhow!("throttled"))
                .into_notify(ErrorCode::DirectoryReadFailed, "failed to query user connections")
        }

        async fn get(&self, _connection_id: &str) -> Result<Option<Connection>> {
            Ok(None)
        }
    }

    async fn directory_with(connections: &[(&str, &str)]) -> Arc<InMemoryConnectionDirectory> {
        let directory = Arc::new(InMemoryConnectionDirectory::new());
        for (id, user) in connections {
            directory
                .register(Connection::new(
                    id.to_string(),
                    user.to_string(),
                    None,
                    0,
                    Duration::from_secs(3600),
                ))
                .await
                .unwrap();
        }
        directory
    }

    fn detail(user_id: &str) -> NotificationDetail {
        NotificationDetail {
            user_id: user_id.to_string(),
            message: json!("hi"),
            callback: json!("cb1"),
        }
    }

    #[tokio::test]
    async fn test_pushes_to_every_connection_of_user() {
        let directory = directory_with(&[("c1", "a@x.com"), ("c2", "a@x.com"), ("c3", "b@x.com")]).await;
        let pusher = Arc::new(RecordingPusher::default());
        let dispatcher = NotificationDispatcher::new(directory, pusher.clone());

        let report = dispatcher.dispatch(&detail("a@x.com")).await.unwrap();

        assert_eq!(report.delivered, vec!["c1", "c2"]);
        assert!(report.failed.is_empty());
        let sent = pusher.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].1,
            json!({"type": "User Push Notification", "message": "hi", "callback": "cb1"})
        );
    }

    #[tokio::test]
    async fn test_user_without_connections_is_a_no_op() {
        let directory = directory_with(&[]).await;
        let pusher = Arc::new(RecordingPusher::default());
        let dispatcher = NotificationDispatcher::new(directory, pusher.clone());

        let report = dispatcher.dispatch(&detail("a@x.com")).await.unwrap();

        assert_eq!(report.attempted(), 0);
        assert!(pusher.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_does_not_abort_the_rest() {
        let directory = directory_with(&[("c1", "a@x.com"), ("c2", "a@x.com"), ("c3", "a@x.com")]).await;
        let pusher = Arc::new(RecordingPusher {
            unreachable: vec!["c2".to_string()],
            ..RecordingPusher::default()
        });
        let dispatcher = NotificationDispatcher::new(directory.clone(), pusher.clone());

        let report = dispatcher.dispatch(&detail("a@x.com")).await.unwrap();

        assert_eq!(report.delivered, vec!["c1", "c3"]);
        assert_eq!(report.failed, vec!["c2"]);
        // 推送失败不会删除连接记录
        assert!(directory.get("c2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_directory_failure_fails_dispatch() {
        let pusher = Arc::new(RecordingPusher::default());
        let dispatcher = NotificationDispatcher::new(Arc::new(UnreadableDirectory), pusher.clone());

        let err = dispatcher.dispatch(&detail("a@x.com")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::DirectoryReadFailed);
        assert!(pusher.sent.lock().await.is_empty());
    }
}
