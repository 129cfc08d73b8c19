//! Notify Core 公共库
//!
//! 提供配置加载、日志初始化、凭证校验和连接目录，供网关与推送服务共用

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod tracing;
pub mod utils;

pub use auth::{CredentialVerifier, JwtVerifier, KeySource, VerifiedIdentity, build_verifier};
pub use config::{
    AuthConfig, AwsConfig, ConfigManager, DirectoryBackend, DirectoryConfig, LoggingConfig,
    NotifyAppConfig, PushServiceConfig, RecordMode, RedisPoolConfig, app_config, load_config,
};
pub use directory::{Connection, ConnectionDirectory, InMemoryConnectionDirectory, build_directory};
pub use error::*;
pub use utils::*;
