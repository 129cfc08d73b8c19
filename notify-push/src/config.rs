use notify_core::config::{NotifyAppConfig, RecordMode};

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub service_name: String,
    /// API Gateway 管理接口端点
    pub endpoint: Option<String>,
    pub record_mode: RecordMode,
}

impl PushConfig {
    pub fn from_app_config(app: &NotifyAppConfig) -> Self {
        let service = app.push_service();

        let service_name = service
            .service_name
            .unwrap_or_else(|| "notify-push".to_string());

        let endpoint = service
            .endpoint
            .map(|endpoint| endpoint.trim().trim_end_matches('/').to_string())
            .filter(|endpoint| !endpoint.is_empty());

        Self {
            service_name,
            endpoint,
            record_mode: service.record_mode.unwrap_or_default(),
        }
    }
}
