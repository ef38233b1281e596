//! Cron expression parsing and next-occurrence calculation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Convert a standard 5-field Unix cron expression to the format expected by
/// the `cron` crate (seconds first, optional year last).
///
/// 6 and 7 field expressions are passed through unchanged.
pub fn normalize_expression(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {} *", expression.trim())
    } else {
        expression.trim().to_string()
    }
}

/// Parse a 5, 6 or 7 field cron expression
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(&normalize_expression(expression))
        .with_context(|| format!("Invalid cron expression: '{}'", expression))
}

/// First occurrence strictly after `after`, or `None` once the expression is exhausted
pub fn next_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).find(|next| *next > after)
}

/// Validate cron schedule syntax
pub fn validate_cron_schedule(schedule: &str) -> bool {
    let fields = schedule.split_whitespace().count();
    (5..=7).contains(&fields) && parse_schedule(schedule).is_ok()
}
