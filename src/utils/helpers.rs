//! 辅助工具函数模块
//!
//! 提供配置加载、AWS 客户端配置等常用辅助函数

use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::{AwsConfig, NotifyAppConfig};
use crate::error::NotifyError;

/// 服务启动辅助函数
pub struct ServiceHelper;

impl ServiceHelper {
    /// 加载配置并验证
    ///
    /// # 参数
    /// * `config_path` - 配置路径
    /// * `strict` - 是否严格验证配置引用
    pub fn load_config(config_path: Option<&str>, strict: bool) -> Result<&'static NotifyAppConfig> {
        let config = crate::config::load_config(config_path);

        if strict {
            config.validate_references().map_err(|err| {
                NotifyError::invalid_configuration(format!("configuration validation failed: {err}"))
            })?;
            return Ok(config);
        }

        // 非严格模式下，即使验证失败也继续运行，只记录警告日志
        if let Err(e) = config.validate_references() {
            tracing::warn!("configuration reference validation failed: {}", e);
        }

        Ok(config)
    }

    /// 构建共享的 AWS SDK 配置
    ///
    /// 区域优先使用配置值，其次为默认提供链（AWS_REGION 等）
    pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(aws.region.clone().map(Region::new)).or_default_provider();

        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    }
}
