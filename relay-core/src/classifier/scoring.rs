//! Backend routing and priority scoring

use crate::classifier::patterns::CRITICAL_PATHS;
use crate::domain::error_fix::{Complexity, ErrorContext, ErrorType, Severity};

/// Backend used when the routing table has no entry
pub const DEFAULT_BACKEND: &str = "deepseek-coder:1.3b";

const SMALL: &str = "deepseek-coder:1.3b";
const MEDIUM: &str = "deepseek-coder:6.7b";
const LARGE: &str = "deepseek-coder:33b";
const TINY_GENERAL: &str = "llama3.2:1b";

/// Routing table: (type, complexity) -> backend
const BACKEND_TABLE: &[(ErrorType, Complexity, &str)] = &[
    (ErrorType::TypeSystem, Complexity::Simple, SMALL),
    (ErrorType::TypeSystem, Complexity::Complex, MEDIUM),
    (ErrorType::TypeSystem, Complexity::Advanced, LARGE),
    (ErrorType::Framework, Complexity::Simple, SMALL),
    (ErrorType::Framework, Complexity::Complex, MEDIUM),
    (ErrorType::Framework, Complexity::Advanced, LARGE),
    (ErrorType::Test, Complexity::Simple, SMALL),
    (ErrorType::Test, Complexity::Complex, MEDIUM),
    (ErrorType::Test, Complexity::Advanced, MEDIUM),
    (ErrorType::Lint, Complexity::Simple, SMALL),
    (ErrorType::Lint, Complexity::Complex, SMALL),
    (ErrorType::Lint, Complexity::Advanced, MEDIUM),
    (ErrorType::Build, Complexity::Simple, MEDIUM),
    (ErrorType::Build, Complexity::Complex, LARGE),
    (ErrorType::Build, Complexity::Advanced, LARGE),
    (ErrorType::Runtime, Complexity::Simple, SMALL),
    (ErrorType::Runtime, Complexity::Complex, MEDIUM),
    (ErrorType::Runtime, Complexity::Advanced, LARGE),
    (ErrorType::Dependency, Complexity::Simple, TINY_GENERAL),
    (ErrorType::Dependency, Complexity::Complex, SMALL),
    (ErrorType::Dependency, Complexity::Advanced, MEDIUM),
    (ErrorType::General, Complexity::Simple, TINY_GENERAL),
    (ErrorType::General, Complexity::Complex, SMALL),
    (ErrorType::General, Complexity::Advanced, MEDIUM),
];

/// Multiplier applied when the file is an entry point or build manifest
const CRITICAL_PATH_BOOST: f64 = 1.2;

/// Looks up the backend for an error type and complexity
pub fn recommend_backend(error_type: ErrorType, complexity: Complexity) -> &'static str {
    BACKEND_TABLE
        .iter()
        .find(|(ty, cx, _)| *ty == error_type && *cx == complexity)
        .map(|(_, _, backend)| *backend)
        .unwrap_or(DEFAULT_BACKEND)
}

fn type_weight(error_type: ErrorType) -> f64 {
    match error_type {
        ErrorType::TypeSystem => 1.2,
        ErrorType::Framework => 1.1,
        ErrorType::Test => 1.0,
        ErrorType::Lint => 0.8,
        ErrorType::Build => 1.3,
        ErrorType::Runtime => 1.1,
        ErrorType::Dependency => 1.2,
        ErrorType::General => 0.9,
    }
}

/// Advisory urgency score, higher is more urgent
///
/// Critical severity scores 4 before weighting, low scores 1.
pub fn priority_score(error_type: ErrorType, severity: Severity, context: &ErrorContext) -> f64 {
    let base = f64::from(Severity::MAX_ORDINAL + 1 - severity.ordinal());
    let mut score = base * type_weight(error_type);

    let path = context.file_path.to_lowercase();
    if CRITICAL_PATHS.iter().any(|critical| path.contains(critical)) {
        score *= CRITICAL_PATH_BOOST;
    }

    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_table() {
        assert_eq!(
            recommend_backend(ErrorType::Build, Complexity::Complex),
            "deepseek-coder:33b"
        );
        assert_eq!(
            recommend_backend(ErrorType::Dependency, Complexity::Simple),
            "llama3.2:1b"
        );
        assert_eq!(
            recommend_backend(ErrorType::Lint, Complexity::Advanced),
            "deepseek-coder:6.7b"
        );
    }

    #[test]
    fn test_priority_score_values() {
        let plain = ErrorContext::new("lib/util.ts");
        let entry = ErrorContext::new("src/App.ts");

        assert_eq!(
            priority_score(ErrorType::TypeSystem, Severity::Critical, &plain),
            4.8
        );
        assert_eq!(
            priority_score(ErrorType::TypeSystem, Severity::Critical, &entry),
            5.76
        );
        assert_eq!(priority_score(ErrorType::Lint, Severity::Low, &plain), 0.8);
    }

    #[test]
    fn test_priority_score_non_increasing_with_severity() {
        let contexts = [
            ErrorContext::new("src/main.rs"),
            ErrorContext::new("docs/readme.md"),
        ];
        let types = ErrorType::SCAN_ORDER
            .iter()
            .copied()
            .chain(std::iter::once(ErrorType::General));

        for error_type in types {
            for context in &contexts {
                let scores: Vec<f64> = Severity::ALL
                    .iter()
                    .map(|severity| priority_score(error_type, *severity, context))
                    .collect();
                assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
            }
        }
    }
}
