//! Notify Core 错误模块
//!
//! - `NotifyError`：领域错误，携带错误码、原因和仅用于日志的内部细节
//! - `InfraResult`：基础设施层使用的 `anyhow` 结果类型
//! - `InfraResultExt`：在仓储边界将基础设施错误转换为领域错误

use std::fmt;

use thiserror::Error;

/// 错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 握手参数缺失或非法（子协议、access_token）
    BadHandshake,
    /// 凭证校验失败（签名、受众、过期、取钥失败统一归为此类）
    AuthenticationFailed,
    DirectoryWriteFailed,
    DirectoryReadFailed,
    DirectoryDeleteFailed,
    /// 单个连接推送失败，不影响批次
    PushDeliveryFailed,
    /// 入站通知消息体无法解析
    EnvelopeParseFailed,
    InvalidConfiguration,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadHandshake => "BAD_HANDSHAKE",
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::DirectoryWriteFailed => "DIRECTORY_WRITE_FAILED",
            ErrorCode::DirectoryReadFailed => "DIRECTORY_READ_FAILED",
            ErrorCode::DirectoryDeleteFailed => "DIRECTORY_DELETE_FAILED",
            ErrorCode::PushDeliveryFailed => "PUSH_DELIVERY_FAILED",
            ErrorCode::EnvelopeParseFailed => "ENVELOPE_PARSE_FAILED",
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 领域错误
///
/// `details` 只写入日志，不会出现在返回给调用方的响应中。
#[derive(Debug, Error)]
#[error("{code}: {reason}")]
pub struct NotifyError {
    code: ErrorCode,
    reason: String,
    details: Option<String>,
}

impl NotifyError {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            details: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn detail(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn bad_handshake(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadHandshake, reason)
    }

    /// 认证失败不携带具体原因
    pub fn authentication_failed() -> Self {
        Self::new(ErrorCode::AuthenticationFailed, "authentication failed")
    }

    pub fn envelope_parse_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::EnvelopeParseFailed, reason)
    }

    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, reason)
    }
}

pub type Result<T, E = NotifyError> = std::result::Result<T, E>;

/// 基础设施层结果类型
pub type InfraResult<T> = anyhow::Result<T>;

/// 基础设施错误到领域错误的转换
pub trait InfraResultExt<T> {
    fn into_notify(self, code: ErrorCode, reason: &str) -> Result<T>;
}

impl<T, E> InfraResultExt<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn into_notify(self, code: ErrorCode, reason: &str) -> Result<T> {
        self.map_err(|err| {
            let err: anyhow::Error = err.into();
            NotifyError::new(code, reason).details(format!("{err:#}"))
        })
    }
}
