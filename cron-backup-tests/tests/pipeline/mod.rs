//! Pipeline tests
//!
//! These tests run whole backup jobs against mocked storages and notifiers
//! while targets touch the real filesystem. No network access is needed.
//! Run with: `cargo test -p cron-backup-tests --test pipeline`

mod cleanup;
mod postgres;
mod retry_layers;
