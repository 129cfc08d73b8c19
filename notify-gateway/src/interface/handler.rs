//! 路由事件处理
//!
//! 把网关事件转换为命令，再把结果映射为固定的响应。
//! 失败原因只写日志，不出现在响应里。

use std::sync::Arc;

use notify_core::error::NotifyError;
use tracing::{info, instrument, warn};

use crate::application::{AuthorizeCommand, ConnectCommand, DisconnectCommand, GatewayCommandService};
use crate::interface::authorizer::AuthorizerResponse;
use crate::interface::events::{AuthorizerRequest, WebSocketRequest};
use crate::interface::response::GatewayResponse;

pub struct GatewayHandler {
    commands: Arc<GatewayCommandService>,
}

impl GatewayHandler {
    pub fn new(commands: Arc<GatewayCommandService>) -> Self {
        Self { commands }
    }

    #[instrument(skip_all, fields(method_arn = %request.method_arn))]
    pub async fn authorize(
        &self,
        request: AuthorizerRequest,
    ) -> Result<AuthorizerResponse, NotifyError> {
        let command = AuthorizeCommand {
            handshake: request.handshake(),
            method_arn: request.method_arn.clone(),
        };
        let identity = self.commands.handle_authorize(command).await?;
        Ok(AuthorizerResponse::allow(&identity.user_id, &request.method_arn))
    }

    #[instrument(
        skip_all,
        fields(
            route_key = request.route_key(),
            connection_id = request.connection_id().unwrap_or_default()
        )
    )]
    pub async fn connect(&self, request: WebSocketRequest) -> GatewayResponse {
        let request = match request.into_connect_request() {
            Ok(request) => request,
            Err(err) => {
                warn!(code = %err.code(), reason = %err.reason(), "connection rejected");
                return GatewayResponse::connect_rejected();
            }
        };
        let command = ConnectCommand { request };
        match self.commands.handle_connect(command).await {
            Ok(_) => GatewayResponse::connected(),
            Err(_) => GatewayResponse::connect_rejected(),
        }
    }

    #[instrument(
        skip_all,
        fields(
            route_key = request.route_key(),
            connection_id = request.connection_id().unwrap_or_default()
        )
    )]
    pub async fn disconnect(&self, request: WebSocketRequest) -> GatewayResponse {
        let Some(connection_id) = request.connection_id() else {
            warn!("disconnect event without connectionId");
            return GatewayResponse::disconnect_failed();
        };
        let command = DisconnectCommand {
            connection_id: connection_id.to_string(),
        };
        match self.commands.handle_disconnect(command).await {
            Ok(()) => {
                info!("disconnect handled");
                GatewayResponse::disconnected()
            }
            Err(_) => GatewayResponse::disconnect_failed(),
        }
    }
}
