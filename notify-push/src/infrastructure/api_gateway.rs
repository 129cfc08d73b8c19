use async_trait::async_trait;
use aws_sdk_apigatewaymanagement::Client;
use aws_sdk_apigatewaymanagement::error::DisplayErrorContext;
use aws_sdk_apigatewaymanagement::primitives::Blob;
use tracing::{debug, info};

use notify_core::config::AwsConfig;
use notify_core::error::{ErrorCode, NotifyError, Result};
use notify_core::utils::ServiceHelper;

use crate::domain::ConnectionPusher;

/// 通过 API Gateway 管理接口（`PostToConnection`）推送
#[derive(Clone)]
pub struct ApiGatewayPusher {
    client: Client,
}

impl ApiGatewayPusher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// `endpoint` 形如 `https://{api-id}.execute-api.{region}.amazonaws.com/{stage}`
    pub async fn from_config(endpoint: &str, aws: &AwsConfig) -> Self {
        let sdk_config = ServiceHelper::load_sdk_config(aws).await;
        let config = aws_sdk_apigatewaymanagement::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint)
            .build();
        info!(endpoint = %endpoint, "api gateway management client ready");
        Self::new(Client::from_conf(config))
    }
}

#[async_trait]
impl ConnectionPusher for ApiGatewayPusher {
    async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<()> {
        let result = self
            .client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(payload))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(connection_id = %connection_id, "posted to connection");
                Ok(())
            }
            Err(err) => {
                let gone = err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_gone_exception());
                let reason = if gone {
                    "connection is gone"
                } else {
                    "failed to post to connection"
                };
                Err(NotifyError::new(ErrorCode::PushDeliveryFailed, reason)
                    .details(DisplayErrorContext(&err).to_string()))
            }
        }
    }
}
