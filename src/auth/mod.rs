//! 凭证校验
//!
//! 校验连接握手中携带的 `access_token`，并解析出用户身份。
//! 所有失败原因（签名、过期、受众、算法、取钥）对外统一为 `AuthenticationFailed`，
//! 具体原因只写日志。

pub mod key_source;
pub mod verifier;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::config::AuthConfig;
use crate::error::{InfraResult, Result};

pub use key_source::{CachedKeySource, HttpKeySource, KeySource, StaticKeySource};
pub use verifier::JwtVerifier;

/// 校验通过的身份
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    /// 身份声明的值（默认 `email`）
    pub user_id: String,
    pub claims: Map<String, Value>,
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// 按配置构建公钥来源
///
/// 优先使用 `static_jwk`，否则请求 `issuer_url`；远程来源按 `key_cache_ttl_seconds` 缓存，
/// 配置为 0 时每次校验都重新获取。
pub fn build_key_source(auth: &AuthConfig) -> InfraResult<Arc<dyn KeySource>> {
    if let Some(raw) = auth.static_jwk.as_deref().filter(|s| !s.trim().is_empty()) {
        info!("using static signing key");
        return Ok(Arc::new(StaticKeySource::from_json(raw)?));
    }

    let Some(issuer_url) = auth.issuer_url.as_deref().filter(|s| !s.trim().is_empty()) else {
        bail!("auth.issuer_url or auth.static_jwk is required");
    };

    let http: Arc<dyn KeySource> = Arc::new(HttpKeySource::new(issuer_url, auth.request_timeout())?);
    let ttl = auth.key_cache_ttl();
    info!(issuer = %issuer_url, cache_ttl_secs = ttl.as_secs(), "using remote signing key");
    if ttl.is_zero() {
        Ok(http)
    } else {
        Ok(Arc::new(CachedKeySource::new(http, ttl)))
    }
}

pub fn build_verifier(auth: &AuthConfig) -> InfraResult<Arc<dyn CredentialVerifier>> {
    let key_source = build_key_source(auth)?;
    Ok(Arc::new(JwtVerifier::from_config(auth, key_source)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_configuration_is_an_error() {
        let auth = AuthConfig::default();
        assert!(build_verifier(&auth).is_err());
    }

    #[test]
    fn test_static_key_configuration() {
        let auth = AuthConfig {
            static_jwk: Some(include_str!("testdata/issuer_jwk.json").to_string()),
            ..AuthConfig::default()
        };
        assert!(build_verifier(&auth).is_ok());
    }

    #[test]
    fn test_symmetric_algorithm_configuration_is_an_error() {
        let auth = AuthConfig {
            issuer_url: Some("https://issuer.example.com/keys".to_string()),
            algorithm: Some("HS256".to_string()),
            ..AuthConfig::default()
        };
        assert!(build_verifier(&auth).is_err());
    }
}
