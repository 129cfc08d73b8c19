//! 日志初始化模块
//!
//! Lambda 运行时会把标准输出写入日志服务，因此这里只安装 fmt subscriber。

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// 从配置初始化日志系统
///
/// 优先使用环境变量 `RUST_LOG`，没有则使用配置中的日志级别。
/// 重复调用时忽略（测试和多次引导场景）。
///
/// # 示例
/// ```rust,ignore
/// use notify_core::config::load_config;
/// use notify_core::tracing::init_tracing_from_config;
///
/// let config = load_config(None);
/// init_tracing_from_config(Some(&config.logging));
/// ```
pub fn init_tracing_from_config(logging_config: Option<&LoggingConfig>) {
    let default_config = LoggingConfig::default();
    let config = logging_config.unwrap_or(&default_config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = fmt::Subscriber::builder()
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_file(config.with_file)
        .with_line_number(config.with_line_number)
        .with_env_filter(env_filter);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = result {
        ::tracing::debug!("tracing subscriber already installed: {err}");
    }
}
