//! Shared validation helpers.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref SYMBOL_NAME: Regex =
        Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("symbol pattern compiles");
}

/// Largest millisecond time that still fits in microseconds.
pub const MAX_TIME_MS: u64 = u64::MAX / 1_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_symbol_name(name: &str) -> Result<(), ValidationError> {
    if SYMBOL_NAME.is_match(name) {
        Ok(())
    } else {
        Err(invalid("invalid_symbol_name", "symbol must be a C identifier"))
    }
}

pub fn validate_time_ms(value: u64) -> Result<(), ValidationError> {
    if value <= MAX_TIME_MS {
        Ok(())
    } else {
        Err(invalid("time_out_of_range", "time does not fit in microseconds"))
    }
}

pub fn validate_power_of_two(value: usize) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(invalid("must_be_power_of_two", "must be a power of two"))
    }
}

pub fn validate_probability(value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid("invalid_probability", "must lie in [0, 1]"))
    }
}

pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(invalid("invalid_log_level", "unknown log level"))
    }
}

pub(crate) fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}
