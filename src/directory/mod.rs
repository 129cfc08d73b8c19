//! 连接目录
//!
//! 保存 `connection_id -> Connection`，并维护 `user_id -> {connection_id}` 二级索引。
//! 提供 DynamoDB、Redis 和进程内三种存储实现。

pub mod dynamo;
pub mod in_memory;
pub mod model;
pub mod redis;
pub mod repository;

use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::info;

use crate::config::{DirectoryBackend, NotifyAppConfig};
use crate::error::InfraResult;

pub use dynamo::DynamoConnectionDirectory;
pub use in_memory::InMemoryConnectionDirectory;
pub use model::Connection;
pub use self::redis::RedisConnectionDirectory;
pub use repository::ConnectionDirectory;

/// 按配置构建连接目录
///
/// 在进程启动时调用一次，返回的实例在所有调用间共享。
pub async fn build_directory(app: &NotifyAppConfig) -> InfraResult<Arc<dyn ConnectionDirectory>> {
    let directory: Arc<dyn ConnectionDirectory> = match app.directory.backend {
        DirectoryBackend::DynamoDb => {
            Arc::new(DynamoConnectionDirectory::from_config(&app.directory, &app.aws).await?)
        }
        DirectoryBackend::Redis => {
            let profile_name = app
                .directory
                .redis
                .as_deref()
                .ok_or_else(|| anyhow!("directory.redis is required for redis backend"))?;
            let profile = app
                .redis_profile(profile_name)
                .with_context(|| format!("redis profile '{profile_name}' not found"))?;
            Arc::new(RedisConnectionDirectory::connect(&profile.url, profile.namespace.clone()).await?)
        }
        DirectoryBackend::Memory => {
            info!("using in-memory connection directory, records are not shared across processes");
            Arc::new(InMemoryConnectionDirectory::new())
        }
    };
    Ok(directory)
}
