pub mod command;
pub mod cron;
pub mod retry;

// Trait-based abstractions for testability
pub mod dispatch;
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use dispatch::{Dispatcher, ExecutionUnit, ProcessDispatcher};
pub use executor::{CommandExecutor, RealExecutor};
pub use retry::RetryPolicy;
