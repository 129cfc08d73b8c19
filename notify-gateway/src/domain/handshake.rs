//! 握手参数校验

use std::collections::HashMap;

use notify_core::error::{NotifyError, Result};

/// 子协议请求头（名称大小写不敏感）
pub const WEBSOCKET_PROTOCOL_HEADER: &str = "sec-websocket-protocol";
/// 唯一接受的子协议
pub const WEBSOCKET_PROTOCOL: &str = "websocket";
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// 升级请求中与认证相关的部分
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl Handshake {
    pub fn new(headers: HashMap<String, String>, query: HashMap<String, String>) -> Self {
        Self { headers, query }
    }

    fn protocol(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(WEBSOCKET_PROTOCOL_HEADER))
            .map(|(_, value)| value.trim())
    }

    /// 校验子协议并取出 `access_token`
    pub fn access_token(&self) -> Result<&str> {
        match self.protocol() {
            Some(WEBSOCKET_PROTOCOL) => {}
            Some(other) => {
                return Err(NotifyError::bad_handshake("unsupported websocket sub-protocol")
                    .details(format!("protocol={other}")));
            }
            None => return Err(NotifyError::bad_handshake("missing websocket sub-protocol")),
        }

        self.query
            .get(ACCESS_TOKEN_PARAM)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| NotifyError::bad_handshake("missing access_token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_core::error::ErrorCode;

    fn handshake(headers: &[(&str, &str)], query: &[(&str, &str)]) -> Handshake {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        Handshake::new(to_map(headers), to_map(query))
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        for name in ["sec-websocket-protocol", "Sec-WebSocket-Protocol", "SEC-WEBSOCKET-PROTOCOL"] {
            let hs = handshake(&[(name, "websocket")], &[("access_token", "T1")]);
            assert_eq!(hs.access_token().unwrap(), "T1");
        }
    }

    #[test]
    fn test_missing_protocol_is_bad_handshake() {
        let hs = handshake(&[("Host", "example.com")], &[("access_token", "T1")]);
        assert_eq!(hs.access_token().unwrap_err().code(), ErrorCode::BadHandshake);
    }

    #[test]
    fn test_other_protocol_is_bad_handshake() {
        let hs = handshake(&[("Sec-WebSocket-Protocol", "graphql-ws")], &[("access_token", "T1")]);
        assert_eq!(hs.access_token().unwrap_err().code(), ErrorCode::BadHandshake);
    }

    #[test]
    fn test_missing_or_empty_token_is_bad_handshake() {
        let hs = handshake(&[("Sec-WebSocket-Protocol", "websocket")], &[]);
        assert_eq!(hs.access_token().unwrap_err().code(), ErrorCode::BadHandshake);

        let hs = handshake(&[("Sec-WebSocket-Protocol", "websocket")], &[("access_token", "")]);
        assert_eq!(hs.access_token().unwrap_err().code(), ErrorCode::BadHandshake);
    }
}
