//! Unit tests for cron-backup
//!
//! Run with: `cargo test -p cron-backup-tests --test unit`

mod config;
mod scheduler;
