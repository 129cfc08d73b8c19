pub mod events;
pub mod handler;
pub mod response;

pub use events::QueueEvent;
pub use handler::NotifyHandler;
pub use response::NotifyResponse;
