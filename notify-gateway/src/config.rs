use std::time::Duration;

use notify_core::config::NotifyAppConfig;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub service_name: String,
    /// 连接记录存活时间
    pub connection_ttl: Duration,
}

impl GatewayConfig {
    pub fn from_app_config(app: &NotifyAppConfig) -> Self {
        let service = app.gateway_service();

        let service_name = service
            .service_name
            .unwrap_or_else(|| "notify-gateway".to_string());

        Self {
            service_name,
            connection_ttl: app.directory.ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_app_config(&NotifyAppConfig::default());
        assert_eq!(config.service_name, "notify-gateway");
        assert_eq!(config.connection_ttl, Duration::from_secs(86_400));
    }
}
