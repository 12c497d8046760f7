//! Logging abstractions for runtime-agnostic logging
//!
//! The adapter never owns a global logger: every stateful component takes an
//! `Arc<dyn Logger>` so the embedding host decides where lines go.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LogLevel};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::MemoryLogger;
