pub mod commands;

pub use commands::{BatchOutcome, NotifyCommand, NotifyCommandHandler, QueueRecord};
