use std::sync::Arc;

use notify_core::config::RecordMode;
use notify_core::error::{NotifyError, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{DeliveryReport, NotificationDetail, NotificationDispatcher};

/// 队列中的一条记录
#[derive(Debug, Clone, Default)]
pub struct QueueRecord {
    pub message_id: Option<String>,
    pub body: Option<Value>,
}

pub struct NotifyCommand {
    pub records: Vec<QueueRecord>,
}

/// 一批记录的处理结果
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub reports: Vec<DeliveryReport>,
    /// 硬失败记录的 `messageId`，供队列部分重投
    pub failed_message_ids: Vec<String>,
    pub hard_failures: usize,
}

impl BatchOutcome {
    /// 所有通知都解析到了目标连接
    pub fn all_resolved(&self) -> bool {
        self.hard_failures == 0
    }
}

pub struct NotifyCommandHandler {
    dispatcher: Arc<NotificationDispatcher>,
    record_mode: RecordMode,
}

impl NotifyCommandHandler {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, record_mode: RecordMode) -> Self {
        Self {
            dispatcher,
            record_mode,
        }
    }

    /// 处理一批记录
    ///
    /// 无法解析的记录跳过；整批没有可用记录时返回 `EnvelopeParseFailed`。
    pub async fn handle(&self, command: NotifyCommand) -> Result<BatchOutcome> {
        let total = command.records.len();
        let envelopes = self.select(command.records);
        if envelopes.is_empty() {
            warn!(records = total, "no notification envelope in batch");
            return Err(NotifyError::envelope_parse_failed(
                "no notification envelope in batch",
            ));
        }

        let mut outcome = BatchOutcome::default();
        for (message_id, detail) in envelopes {
            match self.dispatcher.dispatch(&detail).await {
                Ok(report) => outcome.reports.push(report),
                Err(err) => {
                    warn!(
                        message_id = message_id.as_deref().unwrap_or_default(),
                        user_id = %detail.user_id,
                        code = %err.code(),
                        details = err.detail().unwrap_or_default(),
                        "notification dispatch failed"
                    );
                    outcome.hard_failures += 1;
                    outcome.failed_message_ids.extend(message_id);
                }
            }
        }

        info!(
            records = total,
            dispatched = outcome.reports.len(),
            hard_failures = outcome.hard_failures,
            "notification batch handled"
        );
        Ok(outcome)
    }

    fn select(&self, records: Vec<QueueRecord>) -> Vec<(Option<String>, NotificationDetail)> {
        let parsed = records.into_iter().enumerate().filter_map(|(index, record)| {
            match NotificationDetail::from_body(record.body.as_ref()) {
                Ok(detail) => Some((record.message_id, detail)),
                Err(err) => {
                    warn!(
                        index,
                        message_id = record.message_id.as_deref().unwrap_or_default(),
                        code = %err.code(),
                        reason = %err.reason(),
                        details = err.detail().unwrap_or_default(),
                        "record skipped"
                    );
                    None
                }
            }
        });

        match self.record_mode {
            RecordMode::Each => parsed.collect(),
            RecordMode::Last => parsed.last().into_iter().collect(),
        }
    }
}
