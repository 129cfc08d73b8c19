//! 网关投递给各函数的事件结构
//!
//! 只声明用到的字段，其余字段在反序列化时忽略。

use std::collections::HashMap;

use notify_core::error::{NotifyError, Result};
use serde::Deserialize;

use crate::domain::{ConnectRequest, Handshake};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdentity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerContext {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub route_key: Option<String>,
    /// 毫秒时间戳
    #[serde(default)]
    pub connected_at: Option<i64>,
    #[serde(default)]
    pub identity: Option<RequestIdentity>,
    #[serde(default)]
    pub authorizer: Option<AuthorizerContext>,
}

/// `$connect` / `$disconnect` 路由事件
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketRequest {
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: RequestContext,
}

impl WebSocketRequest {
    /// 缺失或为空时返回 `None`
    pub fn connection_id(&self) -> Option<&str> {
        self.request_context
            .connection_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    pub fn route_key(&self) -> &str {
        self.request_context.route_key.as_deref().unwrap_or_default()
    }

    pub fn handshake(&self) -> Handshake {
        Handshake::new(
            self.headers.clone().unwrap_or_default(),
            self.query_string_parameters.clone().unwrap_or_default(),
        )
    }

    pub fn into_connect_request(self) -> Result<ConnectRequest> {
        let connection_id = self
            .connection_id()
            .ok_or_else(|| NotifyError::bad_handshake("missing requestContext.connectionId"))?
            .to_string();
        let handshake = self.handshake();
        let context = self.request_context;
        Ok(ConnectRequest {
            connection_id,
            handshake,
            source_ip: context.identity.and_then(|identity| identity.source_ip),
            connected_at: context.connected_at,
            authorized_user_id: context
                .authorizer
                .and_then(|authorizer| authorizer.user_id)
                .filter(|user_id| !user_id.is_empty()),
        })
    }
}

/// REQUEST 类型 authorizer 事件
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    #[serde(default)]
    pub method_arn: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl AuthorizerRequest {
    pub fn handshake(&self) -> Handshake {
        Handshake::new(
            self.headers.clone().unwrap_or_default(),
            self.query_string_parameters.clone().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connect_event_mapping() {
        let event = json!({
            "headers": {"Sec-WebSocket-Protocol": "websocket", "Host": "abc.execute-api"},
            "queryStringParameters": {"access_token": "T1"},
            "requestContext": {
                "routeKey": "$connect",
                "eventType": "CONNECT",
                "connectionId": "abc=",
                "connectedAt": 1_700_000_000_000_i64,
                "identity": {"sourceIp": "203.0.113.7", "userAgent": "test"},
                "authorizer": {"userId": "a@x.com", "principalId": "a@x.com"}
            },
            "isBase64Encoded": false
        });

        let request: WebSocketRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.connection_id(), Some("abc="));
        assert_eq!(request.route_key(), "$connect");

        let connect = request.into_connect_request().unwrap();
        assert_eq!(connect.connection_id, "abc=");
        assert_eq!(connect.source_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(connect.connected_at, Some(1_700_000_000_000));
        assert_eq!(connect.authorized_user_id.as_deref(), Some("a@x.com"));
        assert_eq!(connect.handshake.access_token().unwrap(), "T1");
    }

    #[test]
    fn test_null_maps_are_accepted() {
        let event = json!({
            "headers": null,
            "queryStringParameters": null,
            "requestContext": {"connectionId": "abc=", "eventType": "DISCONNECT"}
        });

        let request: WebSocketRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.connection_id(), Some("abc="));
        assert!(request.handshake().access_token().is_err());
    }

    #[test]
    fn test_missing_connection_id_is_bad_handshake() {
        for context in [json!({}), json!({"connectionId": ""}), json!({"connectionId": null})] {
            let request: WebSocketRequest = serde_json::from_value(json!({
                "headers": {"Sec-WebSocket-Protocol": "websocket"},
                "queryStringParameters": {"access_token": "T1"},
                "requestContext": context
            }))
            .unwrap();

            assert_eq!(request.connection_id(), None);
            let err = request.into_connect_request().unwrap_err();
            assert_eq!(err.code(), notify_core::error::ErrorCode::BadHandshake);
        }
    }

    #[test]
    fn test_authorizer_event_mapping() {
        let event = json!({
            "type": "REQUEST",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abc/prod/$connect",
            "headers": {"sec-websocket-protocol": "websocket"},
            "queryStringParameters": {"access_token": "T1"}
        });

        let request: AuthorizerRequest = serde_json::from_value(event).unwrap();
        assert!(request.method_arn.ends_with("$connect"));
        assert_eq!(request.handshake().access_token().unwrap(), "T1");
    }
}
