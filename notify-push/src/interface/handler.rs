use std::sync::Arc;

use tracing::{instrument, warn};

use crate::application::{NotifyCommand, NotifyCommandHandler};
use crate::interface::events::QueueEvent;
use crate::interface::response::NotifyResponse;

pub struct NotifyHandler {
    commands: Arc<NotifyCommandHandler>,
}

impl NotifyHandler {
    pub fn new(commands: Arc<NotifyCommandHandler>) -> Self {
        Self { commands }
    }

    /// 调用本身不失败，整批没有可用记录时返回固定的失败响应
    #[instrument(skip_all, fields(records = event.records.len()))]
    pub async fn handle(&self, event: QueueEvent) -> NotifyResponse {
        let command = NotifyCommand {
            records: event.into_records(),
        };
        match self.commands.handle(command).await {
            Ok(outcome) => NotifyResponse::from(&outcome),
            Err(err) => {
                warn!(code = %err.code(), reason = %err.reason(), "notification batch rejected");
                NotifyResponse::rejected()
            }
        }
    }
}
