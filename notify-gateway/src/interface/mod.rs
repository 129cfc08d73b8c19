pub mod authorizer;
pub mod events;
pub mod handler;
pub mod response;

pub use authorizer::AuthorizerResponse;
pub use events::{AuthorizerRequest, WebSocketRequest};
pub use handler::GatewayHandler;
pub use response::GatewayResponse;
