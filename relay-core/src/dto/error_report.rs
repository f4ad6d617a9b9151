//! Raw error reports
//!
//! The shape error lists arrive in (for example from a JSON file produced by a
//! compiler or linter wrapper) before they are classified.

use serde::{Deserialize, Serialize};

use crate::domain::error_fix::ErrorContext;

/// An unclassified error as reported by a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub code_context: Option<String>,
}

impl ErrorReport {
    pub fn context(&self) -> ErrorContext {
        ErrorContext {
            file_path: self.file.clone(),
            line_number: self.line,
            column_number: self.column,
            function_name: self.function.clone(),
            class_name: self.class.clone(),
            surrounding_code: self.code_context.clone(),
        }
    }
}
