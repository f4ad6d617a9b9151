//! Pattern tables for error classification
//!
//! Table order is significant: types and severities are evaluated top to
//! bottom and the first match wins.

use crate::domain::error_fix::{Complexity, ErrorType, Severity};

/// Extensions whose files are checked by a static type system
pub(crate) const STATICALLY_TYPED_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Path fragments that mark a test file
pub(crate) const TEST_PATH_MARKERS: &[&str] = &["test", "spec"];

/// Path fragments of entry points and build manifests
pub(crate) const CRITICAL_PATHS: &[&str] = &[
    "src/main",
    "src/app",
    "src/index",
    "package.json",
    "tsconfig.json",
    "vite.config",
];

pub(crate) const TYPE_PATTERNS: &[(ErrorType, &[&str])] = &[
    (
        ErrorType::TypeSystem,
        &[
            r"TS\d+:",
            r"Type '.*' is not assignable to type",
            r"Property '.*' does not exist on type",
            r"Cannot find name '.*'",
            r"Expected \d+ arguments, but got \d+",
            r"Object is possibly 'null'",
            r"Object is possibly 'undefined'",
        ],
    ),
    (
        ErrorType::Framework,
        &[
            r"React Hook",
            r"Invalid hook call",
            r"Cannot read propert(y|ies) of undefined",
            r"Cannot read propert(y|ies) of null",
            r"JSX element .* has no corresponding closing tag",
            r"Expected an assignment or function call",
        ],
    ),
    (
        ErrorType::Test,
        &[
            r"Test failed",
            r"expect\(.*\)\.to",
            r"AssertionError",
            r"ReferenceError.*describe",
            r"ReferenceError.*it",
            r"ReferenceError.*expect",
            r"vitest",
            r"jest",
        ],
    ),
    (
        ErrorType::Lint,
        &[
            r"eslint",
            r"Parsing error",
            r"'.*' is defined but never used",
            r"Missing semicolon",
            r"Unexpected token",
        ],
    ),
    (
        ErrorType::Build,
        &[
            r"Build failed",
            r"Module not found",
            r"Cannot resolve module",
            r"Compilation error",
            r"SyntaxError: Unexpected token",
        ],
    ),
    (
        ErrorType::Runtime,
        &[
            r"ReferenceError",
            r"TypeError",
            r"RangeError",
            r"SyntaxError",
            r"at runtime",
        ],
    ),
    (
        ErrorType::Dependency,
        &[
            r"npm ERR!",
            r"yarn error",
            r"Package .* not found",
            r"Module .* not found",
            r"Cannot find module",
        ],
    ),
];

pub(crate) const SEVERITY_PATTERNS: &[(Severity, &[&str])] = &[
    (
        Severity::Critical,
        &[
            r"Build failed",
            r"Compilation error",
            r"SyntaxError",
            r"Cannot find module",
            r"TS\d+:",
        ],
    ),
    (
        Severity::High,
        &[
            r"TypeError",
            r"ReferenceError",
            r"Test failed",
            r"Cannot read propert",
        ],
    ),
    (Severity::Medium, &[r"eslint", r"Warning", r"Deprecated"]),
    (
        Severity::Low,
        &[
            r"'.*' is defined but never used",
            r"Missing semicolon",
            r"Prefer const",
        ],
    ),
];

/// Keyword indicators per complexity tier, in evaluation order
pub(crate) const COMPLEXITY_INDICATORS: &[(Complexity, &[&str])] = &[
    (
        Complexity::Advanced,
        &[
            "Generic type",
            "Conditional type",
            "Mapped type",
            "Complex union",
            "Intersection type",
            "Build failed",
        ],
    ),
    (
        Complexity::Complex,
        &[
            "Type is not assignable",
            "Cannot find name",
            "Hook call",
            "Test failed",
            "Cannot read property",
        ],
    ),
    (
        Complexity::Simple,
        &[
            "Missing semicolon",
            "Unused variable",
            "Prefer const",
            "Missing return type",
            "Property does not exist",
        ],
    ),
];

/// Message length above which an unmatched error counts as complex
pub(crate) const LONG_MESSAGE_CHARS: usize = 200;

/// Surrounding code length above which an unmatched error counts as complex
pub(crate) const LONG_CONTEXT_CHARS: usize = 500;
