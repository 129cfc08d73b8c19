use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::expiry_epoch_seconds;

/// 连接记录的排序键常量
pub const CONNECTION_SORT_KEY: &str = "connection#";
/// 用户索引的排序键常量
pub const USER_SORT_KEY: &str = "user#";

/// 一个存活的 WebSocket 连接
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub user_id: String,
    pub source_ip: Option<String>,
    /// 网关给出的建立时间（毫秒）
    pub connected_at: i64,
    /// 过期时间（秒），超过后视为失效
    pub expires_at: i64,
}

impl Connection {
    pub fn new(
        connection_id: String,
        user_id: String,
        source_ip: Option<String>,
        connected_at: i64,
        ttl: Duration,
    ) -> Self {
        Self::new_at(connection_id, user_id, source_ip, connected_at, ttl, Utc::now())
    }

    pub fn new_at(
        connection_id: String,
        user_id: String,
        source_ip: Option<String>,
        connected_at: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            source_ip,
            connected_at,
            expires_at: expiry_epoch_seconds(now, ttl),
        }
    }

    pub fn is_expired_at(&self, now_epoch_seconds: i64) -> bool {
        self.expires_at <= now_epoch_seconds
    }

    /// 距离过期的剩余秒数，已过期返回 0
    pub fn remaining_ttl_seconds(&self, now_epoch_seconds: i64) -> u64 {
        u64::try_from(self.expires_at.saturating_sub(now_epoch_seconds)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_connection_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let conn = Connection::new_at(
            "c1".to_string(),
            "a@x.com".to_string(),
            Some("10.0.0.1".to_string()),
            now.timestamp_millis(),
            Duration::from_secs(86_400),
            now,
        );

        assert_eq!(conn.expires_at, now.timestamp() + 86_400);
        assert!(!conn.is_expired_at(now.timestamp()));
        assert!(conn.is_expired_at(now.timestamp() + 86_400));
        assert_eq!(conn.remaining_ttl_seconds(now.timestamp() + 86_000), 400);
        assert_eq!(conn.remaining_ttl_seconds(now.timestamp() + 90_000), 0);
    }
}
