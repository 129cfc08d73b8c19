use serde::Serialize;

use crate::application::BatchOutcome;

pub const PUSHED_BODY: &str = "successfully pushed to user";
pub const PUSH_FAILED_BODY: &str = "failed to pushed to user";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

/// 推送函数的返回值
///
/// `batchItemFailures` 供开启部分批量响应的队列只重投失败的记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    pub status_code: u16,
    pub body: String,
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl NotifyResponse {
    /// 整批没有可用记录
    pub fn rejected() -> Self {
        Self {
            status_code: 500,
            body: PUSH_FAILED_BODY.to_string(),
            batch_item_failures: Vec::new(),
        }
    }
}

impl From<&BatchOutcome> for NotifyResponse {
    fn from(outcome: &BatchOutcome) -> Self {
        let (status_code, body) = if outcome.all_resolved() {
            (200, PUSHED_BODY)
        } else {
            (500, PUSH_FAILED_BODY)
        };
        Self {
            status_code,
            body: body.to_string(),
            batch_item_failures: outcome
                .failed_message_ids
                .iter()
                .map(|id| BatchItemFailure {
                    item_identifier: id.clone(),
                })
                .collect(),
        }
    }
}
