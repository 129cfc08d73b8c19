pub mod models;
pub mod repositories;
pub mod service;

pub use models::{DeliveryReport, NotificationDetail, PushPayload};
pub use repositories::ConnectionPusher;
pub use service::NotificationDispatcher;
