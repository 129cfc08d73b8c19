//! 工具函数模块
//!
//! 提供时间戳换算和服务启动辅助函数

pub mod helpers;

pub use helpers::ServiceHelper;

use std::time::Duration;

use chrono::{DateTime, Utc};

/// 当前时间的秒级时间戳
pub fn current_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// 当前时间的毫秒级时间戳
pub fn current_epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 计算从 `now` 起经过 `ttl` 后的秒级时间戳
pub fn expiry_epoch_seconds(now: DateTime<Utc>, ttl: Duration) -> i64 {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    now.timestamp().saturating_add(ttl_secs)
}
