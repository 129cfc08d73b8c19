use serde::Deserialize;
use serde_json::Value;

use crate::application::QueueRecord;

/// 队列批量事件 `{"Records": [...]}`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueEventRecord>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueueEventRecord {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl From<QueueEventRecord> for QueueRecord {
    fn from(record: QueueEventRecord) -> Self {
        QueueRecord {
            message_id: record.message_id,
            body: record.body,
        }
    }
}

impl QueueEvent {
    pub fn into_records(self) -> Vec<QueueRecord> {
        self.records.into_iter().map(QueueRecord::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queue_event_mapping() {
        let event: QueueEvent = serde_json::from_value(json!({
            "Records": [
                {
                    "messageId": "m1",
                    "receiptHandle": "rh",
                    "body": "{\"detail\": {}}",
                    "eventSource": "aws:sqs"
                },
                {"messageId": "m2"}
            ]
        }))
        .unwrap();

        let records = event.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message_id.as_deref(), Some("m1"));
        assert_eq!(records[0].body, Some(json!("{\"detail\": {}}")));
        assert!(records[1].body.is_none());
    }

    #[test]
    fn test_missing_records_is_empty_batch() {
        let event: QueueEvent = serde_json::from_value(json!({})).unwrap();
        assert!(event.into_records().is_empty());
    }
}
