//! 连接生命周期领域服务
//!
//! 连接记录只在这里写入和删除

use std::sync::Arc;
use std::time::Duration;

use notify_core::auth::{CredentialVerifier, VerifiedIdentity};
use notify_core::directory::{Connection, ConnectionDirectory};
use notify_core::error::{NotifyError, Result};
use notify_core::utils::current_epoch_millis;
use tracing::{debug, info, warn};

use crate::domain::handshake::Handshake;
use crate::domain::models::{ConnectRequest, ConnectionState};

pub struct ConnectionLifecycleService {
    directory: Arc<dyn ConnectionDirectory>,
    verifier: Arc<dyn CredentialVerifier>,
    connection_ttl: Duration,
}

impl ConnectionLifecycleService {
    pub fn new(
        directory: Arc<dyn ConnectionDirectory>,
        verifier: Arc<dyn CredentialVerifier>,
        connection_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            verifier,
            connection_ttl,
        }
    }

    /// 校验握手参数和令牌
    pub async fn authenticate(&self, handshake: &Handshake) -> Result<VerifiedIdentity> {
        let token = handshake.access_token()?;
        self.verifier.verify(token).await
    }

    /// 建立连接：认证通过后写入连接记录
    pub async fn connect(&self, request: ConnectRequest) -> Result<Connection> {
        let connection_id = request.connection_id.clone();
        let mut state = ConnectionState::Pending;
        debug!(connection_id = %connection_id, state = %state, "connection attempt started");

        match self.advance(request, &mut state).await {
            Ok(connection) => Ok(connection),
            Err(err) => {
                transition(&connection_id, &mut state, ConnectionState::Rejected);
                warn!(
                    connection_id = %connection_id,
                    code = %err.code(),
                    reason = %err.reason(),
                    details = err.detail().unwrap_or_default(),
                    "connection rejected"
                );
                Err(err)
            }
        }
    }

    async fn advance(
        &self,
        request: ConnectRequest,
        state: &mut ConnectionState,
    ) -> Result<Connection> {
        let identity = self.authenticate(&request.handshake).await?;

        if let Some(authorized) = request.authorized_user_id.as_deref() {
            if authorized != identity.user_id {
                warn!(
                    connection_id = %request.connection_id,
                    authorized_user_id = %authorized,
                    "authorizer identity does not match token identity"
                );
                return Err(NotifyError::authentication_failed());
            }
        }
        transition(&request.connection_id, state, ConnectionState::Authenticated);

        let connection = Connection::new(
            request.connection_id,
            identity.user_id,
            request.source_ip,
            request.connected_at.unwrap_or_else(current_epoch_millis),
            self.connection_ttl,
        );
        self.directory.register(connection.clone()).await?;
        transition(&connection.connection_id, state, ConnectionState::Registered);

        info!(
            connection_id = %connection.connection_id,
            user_id = %connection.user_id,
            expires_at = connection.expires_at,
            "connection registered"
        );
        Ok(connection)
    }

    /// 断开连接，记录不存在不视为错误
    pub async fn disconnect(&self, connection_id: &str) -> Result<()> {
        match self.directory.remove(connection_id).await {
            Ok(()) => {
                info!(connection_id = %connection_id, "connection removed");
                Ok(())
            }
            Err(err) => {
                warn!(
                    connection_id = %connection_id,
                    code = %err.code(),
                    details = err.detail().unwrap_or_default(),
                    "failed to remove connection"
                );
                Err(err)
            }
        }
    }
}

fn transition(connection_id: &str, state: &mut ConnectionState, next: ConnectionState) {
    debug!(connection_id = %connection_id, from = %state, to = %next, "connection state changed");
    *state = next;
}
