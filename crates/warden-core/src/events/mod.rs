//! Event system: handler trait, payloads, synchronous dispatcher.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::WardenEventHandler;
pub use types::*;
