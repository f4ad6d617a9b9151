//! Error classification
//!
//! Maps a raw error message and its source location to a type, severity,
//! complexity tier, recommended backend and priority score. Everything here is
//! pure and deterministic: no I/O, no clocks, no randomness.
//!
//! Type classification is context-prioritized. The path-based rules in
//! [`CONTEXT_RULES`] run first, in order, and only then is the generic pattern
//! table scanned. The order is part of the observable behavior.

mod patterns;
mod scoring;

pub use scoring::{DEFAULT_BACKEND, priority_score, recommend_backend};

use regex::{Regex, RegexBuilder};

use crate::domain::error_fix::{Complexity, ErrorContext, ErrorFix, ErrorType, Severity};
use patterns::{
    COMPLEXITY_INDICATORS, LONG_CONTEXT_CHARS, LONG_MESSAGE_CHARS, SEVERITY_PATTERNS,
    STATICALLY_TYPED_EXTENSIONS, TEST_PATH_MARKERS, TYPE_PATTERNS,
};

/// Path-based hint that promotes one type ahead of the generic scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathHint {
    StaticallyTypedSource,
    TestFile,
}

impl PathHint {
    fn matches(&self, context: &ErrorContext) -> bool {
        match self {
            PathHint::StaticallyTypedSource => {
                STATICALLY_TYPED_EXTENSIONS.contains(&context.extension().as_str())
            }
            PathHint::TestFile => {
                let path = context.file_path.to_lowercase();
                TEST_PATH_MARKERS.iter().any(|marker| path.contains(marker))
            }
        }
    }
}

/// Ordered (predicate, type) pairs evaluated before the generic scan
const CONTEXT_RULES: [(PathHint, ErrorType); 2] = [
    (PathHint::StaticallyTypedSource, ErrorType::TypeSystem),
    (PathHint::TestFile, ErrorType::Test),
];

/// Compiled classification tables
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    type_rules: Vec<(ErrorType, Vec<Regex>)>,
    severity_rules: Vec<(Severity, Vec<Regex>)>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok()
        })
        .collect()
}

fn any_match(rules: &[Regex], message: &str) -> bool {
    rules.iter().any(|re| re.is_match(message))
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self {
            type_rules: TYPE_PATTERNS
                .iter()
                .map(|(ty, patterns)| (*ty, compile(patterns)))
                .collect(),
            severity_rules: SEVERITY_PATTERNS
                .iter()
                .map(|(severity, patterns)| (*severity, compile(patterns)))
                .collect(),
        }
    }

    /// Classifies an error into a type and severity
    pub fn classify(&self, message: &str, context: &ErrorContext) -> (ErrorType, Severity) {
        (
            self.classify_type(message, context),
            self.classify_severity(message),
        )
    }

    fn patterns_for(&self, error_type: ErrorType) -> &[Regex] {
        self.type_rules
            .iter()
            .find(|(ty, _)| *ty == error_type)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    fn classify_type(&self, message: &str, context: &ErrorContext) -> ErrorType {
        for (hint, error_type) in CONTEXT_RULES {
            if hint.matches(context) && any_match(self.patterns_for(error_type), message) {
                return error_type;
            }
        }

        self.type_rules
            .iter()
            .find(|(_, rules)| any_match(rules, message))
            .map(|(ty, _)| *ty)
            .unwrap_or(ErrorType::General)
    }

    fn classify_severity(&self, message: &str) -> Severity {
        self.severity_rules
            .iter()
            .find(|(_, rules)| any_match(rules, message))
            .map(|(severity, _)| *severity)
            .unwrap_or(Severity::Medium)
    }

    /// Estimates how hard the error is to fix
    ///
    /// Keyword indicators are checked advanced first; unmatched errors fall back
    /// to a length heuristic on the message and the surrounding code.
    pub fn determine_complexity(&self, message: &str, context: &ErrorContext) -> Complexity {
        let lowered = message.to_lowercase();

        for (complexity, indicators) in COMPLEXITY_INDICATORS {
            if indicators
                .iter()
                .any(|indicator| lowered.contains(&indicator.to_lowercase()))
            {
                return *complexity;
            }
        }

        let long_context = context
            .surrounding_code
            .as_ref()
            .is_some_and(|code| code.chars().count() > LONG_CONTEXT_CHARS);

        if message.chars().count() > LONG_MESSAGE_CHARS || long_context {
            Complexity::Complex
        } else {
            Complexity::Simple
        }
    }

    /// Runs the full classification pipeline and builds the error fix
    pub fn assess(&self, message: impl Into<String>, context: ErrorContext) -> ErrorFix {
        let message = message.into();
        let (error_type, severity) = self.classify(&message, &context);
        let complexity = self.determine_complexity(&message, &context);
        let backend = recommend_backend(error_type, complexity);
        let score = priority_score(error_type, severity, &context);

        ErrorFix::classified(
            message,
            context,
            error_type,
            severity,
            complexity,
            backend.to_string(),
            score,
        )
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
