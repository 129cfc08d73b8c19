use std::sync::Arc;

use notify_core::auth::VerifiedIdentity;
use notify_core::directory::Connection;
use notify_core::error::Result;
use tracing::{info, warn};

use crate::domain::{ConnectRequest, ConnectionLifecycleService, Handshake};

pub struct AuthorizeCommand {
    pub handshake: Handshake,
    pub method_arn: String,
}

pub struct ConnectCommand {
    pub request: ConnectRequest,
}

pub struct DisconnectCommand {
    pub connection_id: String,
}

/// 网关命令服务
pub struct GatewayCommandService {
    lifecycle: Arc<ConnectionLifecycleService>,
}

impl GatewayCommandService {
    pub fn new(lifecycle: Arc<ConnectionLifecycleService>) -> Self {
        Self { lifecycle }
    }

    pub async fn handle_authorize(&self, command: AuthorizeCommand) -> Result<VerifiedIdentity> {
        match self.lifecycle.authenticate(&command.handshake).await {
            Ok(identity) => {
                info!(user_id = %identity.user_id, method_arn = %command.method_arn, "upgrade authorized");
                Ok(identity)
            }
            Err(err) => {
                warn!(
                    method_arn = %command.method_arn,
                    code = %err.code(),
                    reason = %err.reason(),
                    "upgrade denied"
                );
                Err(err)
            }
        }
    }

    pub async fn handle_connect(&self, command: ConnectCommand) -> Result<Connection> {
        self.lifecycle.connect(command.request).await
    }

    pub async fn handle_disconnect(&self, command: DisconnectCommand) -> Result<()> {
        self.lifecycle.disconnect(&command.connection_id).await
    }
}
