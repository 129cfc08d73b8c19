//! Notify Core 配置模块
//!
//! 该模块提供应用配置管理功能，包括：
//! - 配置文件（单文件或目录片段）加载和合并
//! - 环境特定配置覆盖
//! - Lambda 环境变量覆盖
//! - 连接目录、认证、推送等服务配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::{debug, warn};

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<NotifyAppConfig> = OnceLock::new();

/// 连接记录默认存活时间：24 小时
pub const DEFAULT_CONNECTION_TTL_SECONDS: u64 = 24 * 60 * 60;
/// DynamoDB 用户索引默认名称
pub const DEFAULT_USER_INDEX: &str = "UserID";
/// 令牌受众默认值
pub const DEFAULT_TOKEN_AUDIENCE: &str = "user";
/// 身份声明默认字段
pub const DEFAULT_IDENTITY_CLAIM: &str = "email";

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_file: bool,
    #[serde(default)]
    pub with_line_number: bool,
    /// 输出 JSON 行格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            json: false,
        }
    }
}

/// AWS 客户端配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsConfig {
    /// 区域，未设置时使用默认提供链
    #[serde(default)]
    pub region: Option<String>,
    /// 自定义端点（如 DynamoDB Local）
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Redis 连接配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedisPoolConfig {
    /// Redis 服务器地址
    pub url: String,
    /// 键命名空间前缀
    #[serde(default)]
    pub namespace: Option<String>,
}

/// 连接目录存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    #[default]
    #[serde(alias = "dynamo")]
    DynamoDb,
    Redis,
    Memory,
}

impl std::str::FromStr for DirectoryBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(DirectoryBackend::DynamoDb),
            "redis" => Ok(DirectoryBackend::Redis),
            "memory" => Ok(DirectoryBackend::Memory),
            other => Err(anyhow!("unknown directory backend: {other}")),
        }
    }
}

/// 连接目录配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub backend: DirectoryBackend,
    /// DynamoDB 表名
    #[serde(default)]
    pub table_name: Option<String>,
    /// DynamoDB 用户二级索引名
    #[serde(default)]
    pub user_index: Option<String>,
    /// Redis 配置名称（引用 `[redis.<name>]`）
    #[serde(default)]
    pub redis: Option<String>,
    /// 连接记录存活时间（秒）
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl DirectoryConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.unwrap_or(DEFAULT_CONNECTION_TTL_SECONDS))
    }

    pub fn user_index_name(&self) -> &str {
        self.user_index.as_deref().unwrap_or(DEFAULT_USER_INDEX)
    }
}

/// 认证配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// 签名公钥地址，响应为 `{"data": [jwk, ...]}`
    #[serde(default)]
    pub issuer_url: Option<String>,
    /// 固定公钥（JWK JSON），设置后不再远程获取
    #[serde(default)]
    pub static_jwk: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// 签名算法，默认 RS256
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub identity_claim: Option<String>,
    /// 公钥缓存时间（秒），0 表示每次校验都重新获取
    #[serde(default)]
    pub key_cache_ttl_seconds: Option<u64>,
    /// 公钥请求超时（毫秒）
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl AuthConfig {
    pub fn audience(&self) -> &str {
        self.audience.as_deref().unwrap_or(DEFAULT_TOKEN_AUDIENCE)
    }

    pub fn identity_claim(&self) -> &str {
        self.identity_claim
            .as_deref()
            .unwrap_or(DEFAULT_IDENTITY_CLAIM)
    }

    pub fn key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.key_cache_ttl_seconds.unwrap_or(300))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(5_000))
    }
}

/// 通知批次中多条记录的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// 每条记录独立投递
    #[default]
    Each,
    /// 仅投递最后一条可解析的记录（兼容旧行为）
    Last,
}

impl std::str::FromStr for RecordMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "each" => Ok(RecordMode::Each),
            "last" => Ok(RecordMode::Last),
            other => Err(anyhow!("unknown record mode: {other}")),
        }
    }
}

/// 网关服务配置（authorizer / connect / disconnect）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayServiceConfig {
    #[serde(default)]
    pub service_name: Option<String>,
}

/// 推送服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PushServiceConfig {
    #[serde(default)]
    pub service_name: Option<String>,
    /// API Gateway 管理接口端点（https://{api-id}.execute-api.{region}.amazonaws.com/{stage}）
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub record_mode: Option<RecordMode>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    #[serde(default)]
    pub gateway: Option<GatewayServiceConfig>,
    #[serde(default)]
    pub push: Option<PushServiceConfig>,
}

/// 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifyAppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Redis 配置映射
    #[serde(default)]
    pub redis: HashMap<String, RedisPoolConfig>,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl NotifyAppConfig {
    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config format")
    }

    /// 获取 Redis 配置
    pub fn redis_profile(&self, name: &str) -> Option<&RedisPoolConfig> {
        self.redis.get(name)
    }

    /// 获取网关服务配置
    pub fn gateway_service(&self) -> GatewayServiceConfig {
        self.services.gateway.clone().unwrap_or_default()
    }

    /// 获取推送服务配置
    pub fn push_service(&self) -> PushServiceConfig {
        self.services.push.clone().unwrap_or_default()
    }

    /// 校验配置引用（存储后端所需字段、Redis 配置名称）
    pub fn validate_references(&self) -> Result<()> {
        match self.directory.backend {
            DirectoryBackend::DynamoDb => {
                if self.directory.table_name.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow!("directory.table_name is required for dynamodb backend"));
                }
            }
            DirectoryBackend::Redis => {
                let name = self
                    .directory
                    .redis
                    .as_deref()
                    .ok_or_else(|| anyhow!("directory.redis is required for redis backend"))?;
                if self.redis_profile(name).is_none() {
                    return Err(anyhow!("redis profile '{name}' referenced by directory is not defined"));
                }
            }
            DirectoryBackend::Memory => {}
        }
        Ok(())
    }
}

/// 加载配置
///
/// 优先级：环境变量 > `config/environments/{NOTIFY_ENV}.toml` > 配置文件/目录 > 默认值
pub fn load_config(path: Option<&str>) -> &'static NotifyAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| {
        let mut value = load_with_fallback(&candidates);
        match ConfigManager::load_environment_config() {
            Ok(Some(overlay)) => merge_value(&mut value, overlay),
            Ok(None) => {}
            Err(e) => warn!("failed to load environment config: {e:#}"),
        }

        let mut cfg: NotifyAppConfig = match value.try_into() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("invalid configuration, falling back to defaults: {e}");
                NotifyAppConfig::default()
            }
        };
        ConfigManager::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
        cfg
    })
}

/// 获取应用配置
pub fn app_config() -> Option<&'static NotifyAppConfig> {
    APP_CONFIG.get()
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> Value {
    for path in candidates {
        if !path.exists() {
            debug!("config source {} does not exist", path.display());
            continue;
        }
        match load_config_value(path) {
            Ok(value) => return value,
            Err(err) => warn!("failed to load config from {}: {err:#}", path.display()),
        }
    }

    debug!("no configuration file found, using defaults and environment");
    Value::Table(Default::default())
}

/// 从文件或目录加载配置值
pub fn load_config_value(path: &Path) -> Result<Value> {
    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_toml_value(path)
    }
}

/// 从目录加载配置
fn load_config_from_directory(path: &Path) -> Result<Value> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 合并目录中的配置片段（按文件名排序）
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值，overlay 中的表逐键覆盖 base
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [logging]
        level = "debug"
        json = true

        [directory]
        backend = "redis"
        redis = "directory"
        ttl_seconds = 600

        [redis.directory]
        url = "redis://127.0.0.1:6379/0"
        namespace = "notify"

        [auth]
        issuer_url = "https://issuer.example.com/keys"
        key_cache_ttl_seconds = 0

        [services.push]
        endpoint = "https://abc.execute-api.us-east-1.amazonaws.com/prod"
        record_mode = "last"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let cfg = NotifyAppConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        assert_eq!(cfg.directory.backend, DirectoryBackend::Redis);
        assert_eq!(cfg.directory.ttl(), Duration::from_secs(600));
        assert_eq!(cfg.directory.user_index_name(), DEFAULT_USER_INDEX);
        assert_eq!(
            cfg.redis_profile("directory").map(|p| p.url.as_str()),
            Some("redis://127.0.0.1:6379/0")
        );
        assert_eq!(cfg.auth.audience(), "user");
        assert_eq!(cfg.auth.identity_claim(), "email");
        assert_eq!(cfg.auth.key_cache_ttl(), Duration::ZERO);
        assert_eq!(cfg.push_service().record_mode, Some(RecordMode::Last));
        assert!(cfg.validate_references().is_ok());
    }

    #[test]
    fn test_defaults() {
        let cfg = NotifyAppConfig::from_toml_str("").unwrap();

        assert_eq!(cfg.directory.backend, DirectoryBackend::DynamoDb);
        assert_eq!(
            cfg.directory.ttl(),
            Duration::from_secs(DEFAULT_CONNECTION_TTL_SECONDS)
        );
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.push_service().record_mode, None);
        // dynamodb 后端缺少表名
        assert!(cfg.validate_references().is_err());
    }

    #[test]
    fn test_validate_missing_redis_profile() {
        let cfg = NotifyAppConfig::from_toml_str(
            r#"
            [directory]
            backend = "redis"
            redis = "missing"
            "#,
        )
        .unwrap();

        let err = cfg.validate_references().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_merge_value_overrides_nested_keys() {
        let mut base: Value = toml::from_str(
            r#"
            [directory]
            backend = "dynamodb"
            table_name = "connections"
            "#,
        )
        .unwrap();
        let overlay: Value = toml::from_str(
            r#"
            [directory]
            table_name = "connections-dev"
            "#,
        )
        .unwrap();

        merge_value(&mut base, overlay);
        let cfg: NotifyAppConfig = base.try_into().unwrap();

        assert_eq!(cfg.directory.backend, DirectoryBackend::DynamoDb);
        assert_eq!(cfg.directory.table_name.as_deref(), Some("connections-dev"));
    }

    #[test]
    fn test_shipped_config_files_parse() {
        let mut base: Value = toml::from_str(include_str!("../../config/base.toml")).unwrap();
        let cfg: NotifyAppConfig = base.clone().try_into().unwrap();
        assert_eq!(cfg.directory.backend, DirectoryBackend::DynamoDb);
        assert_eq!(cfg.push_service().record_mode, Some(RecordMode::Each));

        let local: Value =
            toml::from_str(include_str!("../../config/environments/local.toml")).unwrap();
        merge_value(&mut base, local);
        let cfg: NotifyAppConfig = base.try_into().unwrap();
        assert_eq!(cfg.directory.backend, DirectoryBackend::Redis);
        assert!(cfg.validate_references().is_ok());
    }
}
