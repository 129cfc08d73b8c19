//! 配置管理器 - 负责处理不同环境下的配置覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 加载环境特定配置
//! - 应用 Lambda 环境变量覆盖

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;
use tracing::warn;

use super::{NotifyAppConfig, RedisPoolConfig};

/// 由 `REDIS_URL` 注入的 Redis 配置名称
const ENV_REDIS_PROFILE: &str = "env";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 NOTIFY_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 加载 config/environments/{environment}.toml
    ///
    /// 文件不存在时返回 `Ok(None)`
    pub fn load_environment_config() -> Result<Option<Value>> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);

        if !Path::new(&env_config_path).exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&env_config_path)
            .with_context(|| format!("unable to read environment config: {}", env_config_path))?;
        let value: Value = toml::from_str(&content)
            .with_context(|| format!("invalid environment config: {}", env_config_path))?;
        Ok(Some(value))
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 一般为 `std::env::var`，测试中可替换
    pub fn apply_env_overrides<F>(config: &mut NotifyAppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = get("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            config.logging.json = format.eq_ignore_ascii_case("json");
        }

        if let Some(region) = get("AWS_REGION") {
            config.aws.region = Some(region);
        }
        if let Some(endpoint) = get("AWS_ENDPOINT_URL") {
            config.aws.endpoint_url = Some(endpoint);
        }

        if let Some(backend) = get("DIRECTORY_BACKEND") {
            match backend.parse() {
                Ok(backend) => config.directory.backend = backend,
                Err(err) => warn!("ignoring DIRECTORY_BACKEND: {err}"),
            }
        }
        if let Some(table_name) = get("TABLE_NAME") {
            config.directory.table_name = Some(table_name);
        }
        if let Some(index) = get("USER_INDEX_NAME") {
            config.directory.user_index = Some(index);
        }
        if let Some(ttl) = get("CONNECTION_TTL_SECONDS") {
            match ttl.parse::<u64>() {
                Ok(ttl) => config.directory.ttl_seconds = Some(ttl),
                Err(err) => warn!("ignoring CONNECTION_TTL_SECONDS: {err}"),
            }
        }
        if let Some(url) = get("REDIS_URL") {
            config.redis.insert(
                ENV_REDIS_PROFILE.to_string(),
                RedisPoolConfig {
                    url,
                    namespace: None,
                },
            );
            if config.directory.redis.is_none() {
                config.directory.redis = Some(ENV_REDIS_PROFILE.to_string());
            }
        }

        if let Some(issuer) = get("ISSUER") {
            config.auth.issuer_url = Some(issuer);
        }
        if let Some(audience) = get("TOKEN_AUDIENCE") {
            config.auth.audience = Some(audience);
        }

        let push_overrides = (get("ENDPOINT"), get("NOTIFY_RECORD_MODE"));
        if push_overrides.0.is_some() || push_overrides.1.is_some() {
            let push = config.services.push.get_or_insert_with(Default::default);
            if let Some(endpoint) = push_overrides.0 {
                push.endpoint = Some(endpoint);
            }
            if let Some(mode) = push_overrides.1 {
                match mode.parse() {
                    Ok(mode) => push.record_mode = Some(mode),
                    Err(err) => warn!("ignoring NOTIFY_RECORD_MODE: {err}"),
                }
            }
        }
    }
}
