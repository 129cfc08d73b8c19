//! 应用启动器 - 负责依赖注入
//!
//! 目录客户端和管理接口客户端在进程启动时构建一次，之后的批次复用。

use std::sync::Arc;

use anyhow::Result;
use notify_core::config::NotifyAppConfig;
use notify_core::directory::{ConnectionDirectory, build_directory};
use notify_core::error::NotifyError;
use notify_core::tracing::init_tracing_from_config;
use notify_core::utils::ServiceHelper;
use tracing::info;

use crate::application::NotifyCommandHandler;
use crate::config::PushConfig;
use crate::domain::{ConnectionPusher, NotificationDispatcher};
use crate::infrastructure::ApiGatewayPusher;
use crate::interface::NotifyHandler;

/// 配置路径环境变量，未设置时依次尝试 `config/` 与 `config.toml`
pub const CONFIG_PATH_ENV: &str = "NOTIFY_CONFIG";

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: PushConfig,
    pub handler: Arc<NotifyHandler>,
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
            record_mode = ?context.config.record_mode,
            backend = ?app_config.directory.backend,
            "push context initialized"
        );
        Ok(context)
    }

    /// 创建应用上下文
    pub async fn create_context(config: &NotifyAppConfig) -> Result<ApplicationContext> {
        let push_config = PushConfig::from_app_config(config);
        let endpoint = push_config
            .endpoint
            .clone()
            .ok_or_else(|| {
                NotifyError::invalid_configuration("services.push.endpoint (ENDPOINT) is required")
            })?;

        let directory = build_directory(config).await?;
        let pusher = Arc::new(ApiGatewayPusher::from_config(&endpoint, &config.aws).await);

        Ok(Self::with_dependencies(push_config, directory, pusher))
    }

    /// 使用已构建的依赖组装上下文
    pub fn with_dependencies(
        config: PushConfig,
        directory: Arc<dyn ConnectionDirectory>,
        pusher: Arc<dyn ConnectionPusher>,
    ) -> ApplicationContext {
        let dispatcher = Arc::new(NotificationDispatcher::new(directory, pusher));
        let commands = Arc::new(NotifyCommandHandler::new(dispatcher, config.record_mode));
        let handler = Arc::new(NotifyHandler::new(commands));

        ApplicationContext { config, handler }
    }
}
