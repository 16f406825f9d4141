//! Consolidated error codes and classification system
//!
//! Single source of truth for all error codes, their metadata, and classification functions.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
}

/// Lexical analysis error codes
pub mod lexical {
    use super::Code;

    pub const UNEXPECTED_TOKEN: Code = Code::new("E020");
    pub const MALFORMED_NUMBER: Code = Code::new("E021");
    pub const UNTERMINATED_STRING: Code = Code::new("E022");
    pub const NEWLINE_IN_STRING: Code = Code::new("E023");
    pub const SOURCE_TOO_LARGE: Code = Code::new("E024");
    pub const STRING_TOO_LARGE: Code = Code::new("E025");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E026");
    pub const TOKEN_LIMIT_EXCEEDED: Code = Code::new("E027");
}

/// Annotation and value grammar error codes
pub mod syntax {
    use super::Code;

    pub const UNKNOWN_ANNOTATION_CLASS: Code = Code::new("E040");
    pub const NAMED_PARAMETER_REQUIRED: Code = Code::new("E041");
    pub const INVALID_VALUE_TYPE: Code = Code::new("E042");
    pub const EXPECTED_LITERAL: Code = Code::new("E043");
    pub const MALFORMED_CLASS_CONSTANT: Code = Code::new("E044");
    pub const MAX_DEPTH_EXCEEDED: Code = Code::new("E045");
    pub const CONSTRUCTION_FAILED: Code = Code::new("E046");
}

/// Query grammar error codes
pub mod query {
    use super::Code;

    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const MISSING_RETRIEVE: Code = Code::new("E051");
    pub const DUPLICATE_RETRIEVE: Code = Code::new("E052");
    pub const DUPLICATE_RANGE: Code = Code::new("E053");
    pub const UNKNOWN_FUNCTION: Code = Code::new("E054");
    pub const INVALID_WINDOW: Code = Code::new("E055");
    pub const IDENTIFIER_CHAIN_TOO_LONG: Code = Code::new("E056");
    pub const EXPRESSION_TOO_DEEP: Code = Code::new("E057");
}

/// Configuration error codes
pub mod config {
    use super::Code;

    pub const CONFIG_PARSE_ERROR: Code = Code::new("E070");
    pub const CONFIG_ROOT_NOT_TABLE: Code = Code::new("E071");
    pub const CONFIG_VALUE_OUT_OF_RANGE: Code = Code::new("E072");
    pub const CONFIG_IO_ERROR: Code = Code::new("E073");
}

/// Batch processing error codes
pub mod batch {
    use super::Code;

    pub const DIRECTORY_NOT_FOUND: Code = Code::new("E090");
    pub const NO_SOURCES_FOUND: Code = Code::new("E091");
    pub const THREAD_FAILURE: Code = Code::new("E092");
    pub const TOO_MANY_SOURCES: Code = Code::new("E093");
    pub const SOURCE_READ_FAILED: Code = Code::new("E094");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");

    pub const ANNOTATIONS_PARSED: Code = Code::new("I040");
    pub const QUERY_PARSED: Code = Code::new("I041");
    pub const CONDITION_PARSED: Code = Code::new("I042");

    pub const BATCH_COMPLETE: Code = Code::new("I090");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

type MetadataRow = (
    &'static str,
    &'static str,
    Severity,
    bool,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const METADATA: &[MetadataRow] = &[
    ("ERR001", "System", Severity::Critical, false,
        "Critical internal error", "File a bug report with the failing input"),

    ("E020", "Lexical", Severity::High, false,
        "A specific token was required but a different one was found", "Check the source near the reported position"),
    ("E021", "Lexical", Severity::High, false,
        "Numeric literal contains more than one decimal point", "Use at most one '.' in a number"),
    ("E022", "Lexical", Severity::High, false,
        "String literal is not closed before end of input", "Add the closing quote"),
    ("E023", "Lexical", Severity::High, false,
        "String literal contains a raw newline", "Keep string literals on one line"),
    ("E024", "Lexical", Severity::High, false,
        "Source text exceeds the maximum accepted size", "Split the input"),
    ("E025", "Lexical", Severity::High, false,
        "String literal exceeds the maximum size", "Shorten the string literal"),
    ("E026", "Lexical", Severity::Medium, false,
        "Identifier exceeds the maximum length", "Shorten the identifier"),
    ("E027", "Lexical", Severity::High, false,
        "Token count limit exceeded", "Split the input"),

    ("E040", "Syntax", Severity::High, false,
        "Annotation tag does not resolve to a known class", "Import the annotation class or register it"),
    ("E041", "Syntax", Severity::Medium, false,
        "Only the first annotation parameter may be positional", "Write the parameter as name=value"),
    ("E042", "Syntax", Severity::Medium, false,
        "Named parameter has no valid value", "Use a string, number, boolean, structure or class constant"),
    ("E043", "Syntax", Severity::Medium, false,
        "Structure literal expected a value or key", "Check commas and braces in the structure"),
    ("E044", "Syntax", Severity::Medium, false,
        "'::' must be followed by 'class'", "Write the reference as Name::class"),
    ("E045", "Syntax", Severity::High, false,
        "Nesting depth limit exceeded", "Flatten the structure or raise QUEL_MAX_NESTING_DEPTH"),
    ("E046", "Syntax", Severity::High, false,
        "Annotation value could not be constructed", "Check the annotation's parameters"),

    ("E050", "Query", Severity::High, false,
        "Unexpected token in query", "Check the query near the reported position"),
    ("E051", "Query", Severity::High, false,
        "Query has no retrieve statement", "Add a retrieve (...) statement"),
    ("E052", "Query", Severity::High, false,
        "Query has more than one retrieve statement", "Keep a single retrieve statement per query"),
    ("E053", "Query", Severity::Medium, false,
        "Range name declared twice", "Rename one of the ranges"),
    ("E054", "Query", Severity::Medium, false,
        "Unknown function name in query", "Use one of the supported functions"),
    ("E055", "Query", Severity::Medium, false,
        "Window requires integer offset and size", "Write window <n> using window_size <m>"),
    ("E056", "Query", Severity::Medium, false,
        "Identifier chain is too long", "Shorten the property path"),
    ("E057", "Query", Severity::High, false,
        "Expression tree is too deep", "Split long operator chains or use in (...)"),

    ("E070", "Config", Severity::High, false,
        "Configuration text could not be parsed", "Fix the TOML or JSON syntax"),
    ("E071", "Config", Severity::High, false,
        "Configuration root must be a table", "Wrap the values in a table"),
    ("E072", "Config", Severity::Medium, false,
        "Configuration value outside allowed range", "Use a value within the documented limits"),
    ("E073", "Config", Severity::High, false,
        "Configuration file could not be read", "Check the path and permissions"),

    ("E090", "Batch", Severity::High, false,
        "Batch directory does not exist", "Check the directory path"),
    ("E091", "Batch", Severity::Low, true,
        "No .quel or .doc sources found", "Check the directory contents"),
    ("E092", "Batch", Severity::Critical, false,
        "Worker thread failed", "File a bug report with the failing input"),
    ("E093", "Batch", Severity::High, false,
        "Batch exceeds the maximum number of sources", "Split the batch"),
    ("E094", "Batch", Severity::Medium, true,
        "Source file could not be read", "Check file permissions"),

    ("I004", "Success", Severity::Low, true, "Logging initialized", "None"),
    ("I020", "Success", Severity::Low, true, "Tokenization completed", "None"),
    ("I040", "Success", Severity::Low, true, "Docblock annotations parsed", "None"),
    ("I041", "Success", Severity::Low, true, "Query parsed", "None"),
    ("I042", "Success", Severity::Low, true, "Condition parsed", "None"),
    ("I090", "Success", Severity::Low, true, "Batch completed", "None"),
];

/// Error metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        METADATA
            .iter()
            .map(
                |&(code, category, severity, recoverable, description, recommended_action)| {
                    (
                        code,
                        ErrorMetadata {
                            code,
                            category,
                            severity,
                            recoverable,
                            description,
                            recommended_action,
                        },
                    )
                },
            )
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_constant_has_metadata() {
        let all = [
            system::INTERNAL_ERROR,
            lexical::MALFORMED_NUMBER,
            lexical::NEWLINE_IN_STRING,
            syntax::NAMED_PARAMETER_REQUIRED,
            syntax::MAX_DEPTH_EXCEEDED,
            query::UNKNOWN_FUNCTION,
            query::EXPRESSION_TOO_DEEP,
            config::CONFIG_IO_ERROR,
            batch::THREAD_FAILURE,
            success::QUERY_PARSED,
        ];
        for code in all {
            assert!(get_error_metadata(code.as_str()).is_some(), "missing {}", code);
        }
    }

    #[test]
    fn test_registry_codes_unique() {
        assert_eq!(get_error_registry().len(), METADATA.len());
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_description("E999"), "Unknown error");
        assert_eq!(get_category("E999"), "Unknown");
        assert_eq!(get_severity("E999"), Severity::Medium);
        assert!(is_recoverable("E999"));
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(get_category("E021"), "Lexical");
        assert_eq!(get_category("E041"), "Syntax");
        assert_eq!(get_category("E053"), "Query");
        assert_eq!(get_severity("ERR001"), Severity::Critical);
    }
}
