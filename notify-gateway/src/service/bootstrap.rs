//! 应用启动器 - 负责依赖注入
//!
//! 每个进程只构建一次上下文，目录客户端、HTTP 客户端和公钥缓存在多次调用间复用。

use std::sync::Arc;

use anyhow::Result;
use notify_core::auth::{CredentialVerifier, build_verifier};
use notify_core::config::NotifyAppConfig;
use notify_core::directory::{ConnectionDirectory, build_directory};
use notify_core::tracing::init_tracing_from_config;
use notify_core::utils::ServiceHelper;
use tracing::info;

use crate::application::GatewayCommandService;
use crate::config::GatewayConfig;
use crate::domain::ConnectionLifecycleService;
use crate::interface::GatewayHandler;

/// 配置路径环境变量，未设置时依次尝试 `config/` 与 `config.toml`
pub const CONFIG_PATH_ENV: &str = "NOTIFY_CONFIG";

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: GatewayConfig,
    pub handler: Arc<GatewayHandler>,
}

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 加载配置、初始化日志并构建上下文
    pub async fn initialize() -> Result<ApplicationContext> {
        let config_path = std::env::var(CONFIG_PATH_ENV).ok();
        let app_config = ServiceHelper::load_config(config_path.as_deref(), true)?;
        init_tracing_from_config(Some(&app_config.logging));

        let context = Self::create_context(app_config).await?;
        info!(
            service = %context.config.service_name,
            backend = ?app_config.directory.backend,
            "gateway context initialized"
        );
        Ok(context)
    }

    /// 创建应用上下文
    pub async fn create_context(config: &NotifyAppConfig) -> Result<ApplicationContext> {
        let gateway_config = GatewayConfig::from_app_config(config);
        let directory = build_directory(config).await?;
        let verifier = build_verifier(&config.auth)?;

        Ok(Self::with_dependencies(gateway_config, directory, verifier))
    }

    /// 使用已构建的依赖组装上下文
    pub fn with_dependencies(
        config: GatewayConfig,
        directory: Arc<dyn ConnectionDirectory>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> ApplicationContext {
        let lifecycle = Arc::new(ConnectionLifecycleService::new(
            directory,
            verifier,
            config.connection_ttl,
        ));
        let commands = Arc::new(GatewayCommandService::new(lifecycle));
        let handler = Arc::new(GatewayHandler::new(commands));

        ApplicationContext { config, handler }
    }
}
