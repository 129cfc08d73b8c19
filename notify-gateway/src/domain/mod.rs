pub mod handshake;
pub mod models;
pub mod service;

pub use handshake::Handshake;
pub use models::{ConnectRequest, ConnectionState};
pub use service::ConnectionLifecycleService;
