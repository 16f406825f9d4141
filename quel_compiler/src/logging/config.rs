//! Logging configuration
//!
//! Runtime preferences are stored once per process; anything not
//! initialized falls back to the environment-derived defaults.

use crate::config::compile_time::logging::*;
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Initialize runtime preferences
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), String> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| "Runtime preferences already initialized".to_string())
}

fn get_runtime_preferences() -> LoggingPreferences {
    RUNTIME_PREFERENCES.get().cloned().unwrap_or_default()
}

/// Minimum level that reaches the loggers
pub fn get_min_log_level() -> EventsLogLevel {
    get_runtime_preferences().min_log_level.to_events_log_level()
}

pub fn use_structured_logging() -> bool {
    get_runtime_preferences().use_structured_logging
}

pub fn use_console_logging() -> bool {
    get_runtime_preferences().enable_console_logging
}

pub fn include_source_context() -> bool {
    get_runtime_preferences().include_source_context
}

/// Capacity of the in-memory logger (compile-time constant)
pub fn get_memory_capacity() -> usize {
    MEMORY_LOGGER_CAPACITY
}

/// Truncate a context value to the compile-time maximum
pub fn clamp_context_value(value: &str) -> &str {
    if value.len() <= MAX_CONTEXT_VALUE_LENGTH {
        return value;
    }
    let mut end = MAX_CONTEXT_VALUE_LENGTH;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

pub fn get_config_summary() -> String {
    let preferences = get_runtime_preferences();
    format!(
        "Logging configuration:\n  level: {}\n  structured: {}\n  console: {}\n  source context: {}\n  memory capacity: {}\n",
        preferences.min_log_level.as_str(),
        preferences.use_structured_logging,
        preferences.enable_console_logging,
        preferences.include_source_context,
        MEMORY_LOGGER_CAPACITY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_respects_char_boundaries() {
        let long = "é".repeat(MAX_CONTEXT_VALUE_LENGTH);
        let clamped = clamp_context_value(&long);
        assert!(clamped.len() <= MAX_CONTEXT_VALUE_LENGTH);
        assert!(clamped.chars().all(|c| c == 'é'));

        assert_eq!(clamp_context_value("short"), "short");
    }

    #[test]
    fn test_summary_mentions_level() {
        assert!(get_config_summary().contains("level:"));
    }
}
