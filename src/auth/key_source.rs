//! 签名公钥来源
//!
//! - `HttpKeySource`：从签发方地址获取 `{"data": [jwk, ...]}`，取第一个
//! - `StaticKeySource`：配置中固定的 JWK
//! - `CachedKeySource`：进程内缓存，过期后重新获取

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::InfraResult;

#[async_trait]
pub trait KeySource: Send + Sync {
    async fn signing_key(&self) -> InfraResult<Jwk>;
}

#[derive(Deserialize)]
struct IssuerKeys {
    #[serde(default)]
    data: Vec<Value>,
}

impl IssuerKeys {
    fn first_key(self) -> InfraResult<Jwk> {
        let first = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("issuer returned an empty key set"))?;
        serde_json::from_value(first).context("issuer key is not a valid JWK")
    }
}

/// 远程公钥来源，单次请求，无重试
pub struct HttpKeySource {
    client: reqwest::Client,
    issuer_url: String,
}

impl HttpKeySource {
    pub fn new(issuer_url: impl Into<String>, timeout: Duration) -> InfraResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            issuer_url: issuer_url.into(),
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn signing_key(&self) -> InfraResult<Jwk> {
        debug!(issuer = %self.issuer_url, "fetching signing key");

        let response = self
            .client
            .get(&self.issuer_url)
            .send()
            .await
            .with_context(|| format!("failed to fetch keys from '{}'", self.issuer_url))?
            .error_for_status()
            .with_context(|| format!("key request to '{}' was rejected", self.issuer_url))?;

        let keys: IssuerKeys = response
            .json()
            .await
            .with_context(|| format!("failed to parse key response from '{}'", self.issuer_url))?;

        keys.first_key()
    }
}

/// 固定公钥
pub struct StaticKeySource {
    jwk: Jwk,
}

impl StaticKeySource {
    pub fn new(jwk: Jwk) -> Self {
        Self { jwk }
    }

    pub fn from_json(raw: &str) -> InfraResult<Self> {
        let jwk = serde_json::from_str(raw).context("static key is not a valid JWK")?;
        Ok(Self::new(jwk))
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn signing_key(&self) -> InfraResult<Jwk> {
        Ok(self.jwk.clone())
    }
}

/// 带过期时间的公钥缓存
pub struct CachedKeySource {
    inner: Arc<dyn KeySource>,
    ttl: Duration,
    cached: RwLock<Option<(Jwk, Instant)>>,
}

impl CachedKeySource {
    pub fn new(inner: Arc<dyn KeySource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl KeySource for CachedKeySource {
    async fn signing_key(&self) -> InfraResult<Jwk> {
        {
            let cache = self.cached.read().await;
            if let Some((jwk, fetched_at)) = cache.as_ref() {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(jwk.clone());
                }
            }
        }

        let jwk = self.inner.signing_key().await?;
        *self.cached.write().await = Some((jwk.clone(), Instant::now()));
        info!(ttl_secs = self.ttl.as_secs(), "signing key cache refreshed");
        Ok(jwk)
    }
}
