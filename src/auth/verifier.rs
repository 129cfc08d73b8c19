use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{CredentialVerifier, KeySource, VerifiedIdentity};
use crate::config::AuthConfig;
use crate::error::{InfraResult, NotifyError, Result};

const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

/// 基于远程 JWK 的令牌校验器
///
/// 签名算法固定（非对称），受众必须匹配，`exp`/`nbf` 存在时校验。
pub struct JwtVerifier {
    key_source: Arc<dyn KeySource>,
    algorithm: Algorithm,
    audience: String,
    identity_claim: String,
}

impl JwtVerifier {
    pub fn new(
        key_source: Arc<dyn KeySource>,
        algorithm: Algorithm,
        audience: impl Into<String>,
        identity_claim: impl Into<String>,
    ) -> Self {
        Self {
            key_source,
            algorithm,
            audience: audience.into(),
            identity_claim: identity_claim.into(),
        }
    }

    pub fn from_config(auth: &AuthConfig, key_source: Arc<dyn KeySource>) -> InfraResult<Self> {
        let algorithm = parse_algorithm(auth.algorithm.as_deref())?;
        Ok(Self::new(
            key_source,
            algorithm,
            auth.audience(),
            auth.identity_claim(),
        ))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["aud"]);
        validation.validate_nbf = true;
        validation
    }

    async fn decode_claims(&self, token: &str) -> InfraResult<Map<String, Value>> {
        let jwk = self
            .key_source
            .signing_key()
            .await
            .context("signing key unavailable")?;
        let key = DecodingKey::from_jwk(&jwk).context("signing key is not usable")?;
        let data = decode::<Map<String, Value>>(token, &key, &self.validation())
            .context("token rejected")?;
        Ok(data.claims)
    }

    fn identity_of(&self, claims: &Map<String, Value>) -> InfraResult<String> {
        match claims.get(&self.identity_claim) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(_) => bail!("claim '{}' is not a non-empty string", self.identity_claim),
            None => bail!("claim '{}' is missing", self.identity_claim),
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        debug!(token_len = token.len(), "verifying access token");

        let outcome = match self.decode_claims(token).await {
            Ok(claims) => self
                .identity_of(&claims)
                .map(|user_id| VerifiedIdentity { user_id, claims }),
            Err(err) => Err(err),
        };

        outcome.map_err(|err| {
            warn!(error = %format!("{err:#}"), "access token verification failed");
            NotifyError::authentication_failed()
        })
    }
}

/// 只接受非对称签名算法
fn parse_algorithm(raw: Option<&str>) -> InfraResult<Algorithm> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_ALGORITHM);
    };
    let algorithm = Algorithm::from_str(&raw.to_ascii_uppercase())
        .map_err(|_| anyhow!("unsupported token algorithm '{raw}'"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            bail!("symmetric token algorithm '{raw}' is not allowed")
        }
        other => Ok(other),
    }
}
