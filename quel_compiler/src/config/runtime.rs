// RUNTIME PREFERENCES (User Experience)

use super::constants::compile_time;
use super::values::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalPreferences {
    /// Whether `*` after a newline and comment delimiters are skipped as doc-block decoration
    pub strip_doc_decoration: bool,

    /// Whether to collect token counts while lexing
    pub collect_metrics: bool,

    /// Whether to show line/column information in error messages
    pub include_position_in_errors: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            strip_doc_decoration: env::var("QUEL_LEXICAL_STRIP_DOC_DECORATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            collect_metrics: env::var("QUEL_LEXICAL_COLLECT_METRICS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            include_position_in_errors: env::var("QUEL_LEXICAL_INCLUDE_POSITIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPreferences {
    /// Maximum nesting of structures, parameter lists and parenthesized expressions
    pub max_nesting_depth: usize,

    /// Whether class-name resolutions are memoized per parser instance
    pub enable_resolution_cache: bool,

    /// Whether skipped doc tags (`@param`, `@return`, ...) are logged at debug level
    pub log_ignored_tags: bool,
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            max_nesting_depth: env::var("QUEL_MAX_NESTING_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(compile_time::syntax::DEFAULT_NESTING_DEPTH),
            enable_resolution_cache: env::var("QUEL_PARSER_RESOLUTION_CACHE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            log_ignored_tags: env::var("QUEL_PARSER_LOG_IGNORED_TAGS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPreferences {
    /// Worker threads for parallel parsing; 1 selects the sequential path
    pub threads: usize,

    /// Stop after the first chunk that contains a failure
    pub fail_fast: bool,

    /// Descend into subdirectories when discovering source files
    pub recursive: bool,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            threads: env::var("QUEL_BATCH_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(4)
                }),
            fail_fast: env::var("QUEL_BATCH_FAIL_FAST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            recursive: env::var("QUEL_BATCH_RECURSIVE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging (user preference)
    pub use_structured_logging: bool,

    /// Whether to enable console output (user preference)
    pub enable_console_logging: bool,

    /// User preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to include the current source name in log messages
    pub include_source_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("QUEL_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            enable_console_logging: env::var("QUEL_LOG_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            min_log_level: env::var("QUEL_LOG_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Warning),
            include_source_context: env::var("QUEL_LOG_SOURCE_CONTEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables and CLI flags)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub lexical: LexicalPreferences,
    pub parser: ParserPreferences,
    pub batch: BatchPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Load preferences from TOML text. Missing tables and keys keep their
    /// environment-derived defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig =
            toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check preferences against the compile-time limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_depth = compile_time::syntax::MAX_NESTING_DEPTH;
        if self.parser.max_nesting_depth == 0 || self.parser.max_nesting_depth > max_depth {
            return Err(ConfigError::OutOfRange {
                key: "parser.max_nesting_depth".to_string(),
                value: self.parser.max_nesting_depth.to_string(),
                limit: format!("1..={}", max_depth),
            });
        }

        let max_threads = compile_time::batch::MAX_THREADS;
        if self.batch.threads == 0 || self.batch.threads > max_threads {
            return Err(ConfigError::OutOfRange {
                key: "batch.threads".to_string(),
                value: self.batch.threads.to_string(),
                limit: format!("1..={}", max_threads),
            });
        }

        Ok(())
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // Lexical
    pub const LEXICAL_STRIP_DOC_DECORATION: &str = "QUEL_LEXICAL_STRIP_DOC_DECORATION";
    pub const LEXICAL_COLLECT_METRICS: &str = "QUEL_LEXICAL_COLLECT_METRICS";
    pub const LEXICAL_INCLUDE_POSITIONS: &str = "QUEL_LEXICAL_INCLUDE_POSITIONS";

    // Parser
    pub const MAX_NESTING_DEPTH: &str = "QUEL_MAX_NESTING_DEPTH";
    pub const PARSER_RESOLUTION_CACHE: &str = "QUEL_PARSER_RESOLUTION_CACHE";
    pub const PARSER_LOG_IGNORED_TAGS: &str = "QUEL_PARSER_LOG_IGNORED_TAGS";

    // Batch
    pub const BATCH_THREADS: &str = "QUEL_BATCH_THREADS";
    pub const BATCH_FAIL_FAST: &str = "QUEL_BATCH_FAIL_FAST";
    pub const BATCH_RECURSIVE: &str = "QUEL_BATCH_RECURSIVE";

    // Logging
    pub const LOG_FORMAT: &str = "QUEL_LOG_FORMAT";
    pub const LOG_CONSOLE: &str = "QUEL_LOG_CONSOLE";
    pub const LOG_LEVEL: &str = "QUEL_LOG_LEVEL";
    pub const LOG_SOURCE_CONTEXT: &str = "QUEL_LOG_SOURCE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("2"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_toml_overrides_single_key() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [parser]
            max_nesting_depth = 12

            [batch]
            threads = 2
            fail_fast = true
            "#,
        )
        .unwrap();

        assert_eq!(config.parser.max_nesting_depth, 12);
        assert_eq!(config.batch.threads, 2);
        assert!(config.batch.fail_fast);
    }

    #[test]
    fn test_depth_above_ceiling_rejected() {
        let result = RuntimeConfig::from_toml_str("[parser]\nmax_nesting_depth = 100000\n");
        assert_matches!(result, Err(ConfigError::OutOfRange { ref key, .. }) if key == "parser.max_nesting_depth");
    }

    #[test]
    fn test_malformed_toml_reported() {
        let result = RuntimeConfig::from_toml_str("[parser\nmax_nesting_depth = ");
        assert_matches!(result, Err(ConfigError::Toml(_)));
    }
}
