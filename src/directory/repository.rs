use async_trait::async_trait;

use crate::error::Result;

use super::Connection;

/// 连接目录
///
/// 主键为 `connection_id`，并维护 `user_id` 到连接集合的二级索引。
/// 每个操作只涉及单个键，由存储层保证原子性；已过期的记录不会被返回。
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    /// 写入连接记录，同一 `connection_id` 重复写入时覆盖。
    /// 失败返回 `DirectoryWriteFailed`
    async fn register(&self, connection: Connection) -> Result<()>;

    /// 删除连接记录，记录不存在不视为错误。
    /// 失败返回 `DirectoryDeleteFailed`
    async fn remove(&self, connection_id: &str) -> Result<()>;

    /// 按用户查询所有存活连接。失败返回 `DirectoryReadFailed`
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Connection>>;

    /// 按连接 ID 查询。失败返回 `DirectoryReadFailed`
    async fn get(&self, connection_id: &str) -> Result<Option<Connection>>;
}
