pub mod backup;
pub mod builder;
pub mod logging;
pub mod scheduler;
