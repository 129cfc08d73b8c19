use std::collections::HashMap;

use serde::Serialize;

use crate::domain::handshake::WEBSOCKET_PROTOCOL;

pub const CONNECTED_BODY: &str = "connected to websocket api";
pub const DISCONNECTED_BODY: &str = "disconnected";
pub const DISCONNECT_FAILED_BODY: &str = "failed to disconnect";

/// 路由函数返回给网关的响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl GatewayResponse {
    fn new(status_code: u16, body: &str) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    /// 连接成功，回显子协议
    pub fn connected() -> Self {
        let mut response = Self::new(200, CONNECTED_BODY);
        response.headers.insert(
            "Sec-WebSocket-Protocol".to_string(),
            WEBSOCKET_PROTOCOL.to_string(),
        );
        response
    }

    /// 拒绝升级，正文与成功时相同
    pub fn connect_rejected() -> Self {
        Self::new(500, CONNECTED_BODY)
    }

    pub fn disconnected() -> Self {
        Self::new(200, DISCONNECTED_BODY)
    }

    pub fn disconnect_failed() -> Self {
        Self::new(500, DISCONNECT_FAILED_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connected_wire_format() {
        let value = serde_json::to_value(GatewayResponse::connected()).unwrap();
        assert_eq!(
            value,
            json!({
                "statusCode": 200,
                "headers": {"Sec-WebSocket-Protocol": "websocket"},
                "body": "connected to websocket api"
            })
        );
    }

    #[test]
    fn test_failure_omits_headers() {
        let value = serde_json::to_value(GatewayResponse::disconnect_failed()).unwrap();
        assert_eq!(value, json!({"statusCode": 500, "body": "failed to disconnect"}));
    }
}
