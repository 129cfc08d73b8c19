use std::fmt;

use crate::domain::handshake::Handshake;

/// 连接建立过程中的状态
///
/// `Pending → Authenticated → Registered`，任一步失败进入终态 `Rejected`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Pending,
    Authenticated,
    Registered,
    Rejected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Registered => "registered",
            ConnectionState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接建立请求
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub connection_id: String,
    pub handshake: Handshake,
    pub source_ip: Option<String>,
    /// 网关给出的建立时间（毫秒），缺失时使用当前时间
    pub connected_at: Option<i64>,
    /// 上游 authorizer 已确认的用户
    pub authorized_user_id: Option<String>,
}
