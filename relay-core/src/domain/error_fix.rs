//! Error fix domain types
//!
//! An [`ErrorFix`] describes a build, lint, test or runtime error that should be
//! repaired. Its classification fields are derived by
//! [`ErrorClassifier`](crate::classifier::ErrorClassifier) and cannot be set
//! by hand.

use serde::{Deserialize, Serialize};

/// Category of an error, used for routing and scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Static type checker diagnostics
    TypeSystem,
    /// UI framework misuse (hooks, JSX)
    Framework,
    Test,
    Lint,
    Build,
    Runtime,
    Dependency,
    /// Fallback when nothing else matches
    General,
}

impl ErrorType {
    /// Every type that has match patterns, in scan order
    pub const SCAN_ORDER: [ErrorType; 7] = [
        ErrorType::TypeSystem,
        ErrorType::Framework,
        ErrorType::Test,
        ErrorType::Lint,
        ErrorType::Build,
        ErrorType::Runtime,
        ErrorType::Dependency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::TypeSystem => "type_system",
            ErrorType::Framework => "framework",
            ErrorType::Test => "test",
            ErrorType::Lint => "lint",
            ErrorType::Build => "build",
            ErrorType::Runtime => "runtime",
            ErrorType::Dependency => "dependency",
            ErrorType::General => "general",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity, ordinal 1 (critical) to 4 (low)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks compilation or build
    Critical = 1,
    /// Breaks functionality
    High = 2,
    /// Degrades experience
    Medium = 3,
    /// Minor issues
    Low = 4,
}

impl Severity {
    /// Largest ordinal in the scale
    pub const MAX_ORDINAL: u8 = 4;

    /// Evaluation order for severity matching
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How hard an error looks to fix, used to pick a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Complex,
    Advanced,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Complex => "complex",
            Complexity::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub file_path: String,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub function_name: Option<String>,
    pub class_name: Option<String>,
    pub surrounding_code: Option<String>,
}

impl ErrorContext {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, line: u32, column: Option<u32>) -> Self {
        self.line_number = Some(line);
        self.column_number = column;
        self
    }

    pub fn with_surrounding_code(mut self, code: impl Into<String>) -> Self {
        self.surrounding_code = Some(code.into());
        self
    }

    /// Lower-cased file extension, empty when there is none
    pub fn extension(&self) -> String {
        match self.file_path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }
}

/// A classified error awaiting a fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFix {
    message: String,
    error_type: ErrorType,
    severity: Severity,
    context: ErrorContext,
    complexity: Complexity,
    suggested_backend: String,
    priority_score: f64,
}

impl ErrorFix {
    pub(crate) fn classified(
        message: String,
        context: ErrorContext,
        error_type: ErrorType,
        severity: Severity,
        complexity: Complexity,
        suggested_backend: String,
        priority_score: f64,
    ) -> Self {
        Self {
            message,
            error_type,
            severity,
            context,
            complexity,
            suggested_backend,
            priority_score,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn suggested_backend(&self) -> &str {
        &self.suggested_backend
    }

    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }
}
