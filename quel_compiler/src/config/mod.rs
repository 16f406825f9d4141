//! Configuration for the ObjectQuel compiler
//!
//! Three layers live here:
//! - [`constants`]: compile-time security and resource limits
//! - [`runtime`]: user preferences with environment variable defaults
//! - [`values`]: the configuration mapping injected into the parser for
//!   `${dotted.key}` placeholder resolution

pub mod constants;
pub mod runtime;
pub mod values;

pub use constants::compile_time;
pub use runtime::{
    BatchPreferences, LexicalPreferences, LogLevel, LoggingPreferences, ParserPreferences,
    RuntimeConfig,
};
pub use values::{ConfigError, ConfigMap};
