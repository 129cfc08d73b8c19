use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use notify_core::error::{NotifyError, Result};

/// 推送消息的固定类型标识
pub const PUSH_NOTIFICATION_TYPE: &str = "User Push Notification";

/// 通知内容，`message` 和 `callback` 原样透传
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationDetail {
    pub user_id: String,
    pub message: Value,
    pub callback: Value,
}

#[derive(Debug, Deserialize)]
struct NotificationEnvelope {
    detail: NotificationDetail,
}

impl NotificationDetail {
    /// 从队列记录的消息体解析
    ///
    /// 消息体通常是 JSON 字符串，也接受已经展开的 JSON 对象。
    pub fn from_body(body: Option<&Value>) -> Result<Self> {
        let envelope: NotificationEnvelope = match body {
            None | Some(Value::Null) => {
                return Err(NotifyError::envelope_parse_failed("record has no body"));
            }
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .context("body is not a notification envelope")
                .map_err(|err| {
                    NotifyError::envelope_parse_failed("invalid notification body")
                        .details(format!("{err:#}"))
                })?,
            Some(other) => serde_json::from_value(other.clone()).map_err(|err| {
                NotifyError::envelope_parse_failed("invalid notification body")
                    .details(err.to_string())
            })?,
        };

        if envelope.detail.user_id.is_empty() {
            return Err(NotifyError::envelope_parse_failed("detail.user_id is empty"));
        }
        Ok(envelope.detail)
    }
}

/// 下发到客户端的消息
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: &'a Value,
    pub callback: &'a Value,
}

impl<'a> PushPayload<'a> {
    pub fn new(detail: &'a NotificationDetail) -> Self {
        Self {
            kind: PUSH_NOTIFICATION_TYPE,
            message: &detail.message,
            callback: &detail.callback,
        }
    }

    /// UTF-8 JSON 字节
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| {
            NotifyError::envelope_parse_failed("failed to encode push payload")
                .details(err.to_string())
        })
    }
}

/// 一次扇出的投递结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub user_id: String,
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}
