use async_trait::async_trait;

use notify_core::error::Result;

/// 向单个连接下发消息
#[async_trait]
pub trait ConnectionPusher: Send + Sync {
    /// 失败返回 `PushDeliveryFailed`，连接已失效时 `details` 中会注明
    async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<()>;
}
