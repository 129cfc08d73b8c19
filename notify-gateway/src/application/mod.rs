pub mod commands;

pub use commands::{AuthorizeCommand, ConnectCommand, DisconnectCommand, GatewayCommandService};
