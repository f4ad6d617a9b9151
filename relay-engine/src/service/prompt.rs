//! Prompt construction and response cleanup

use regex::Regex;
use relay_core::domain::error_fix::ErrorFix;
use relay_core::domain::job::TestGeneration;
use std::sync::LazyLock;

/// Characters of source code included in a prompt
const MAX_PROMPT_CODE_CHARS: usize = 2000;

static FENCE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*\n?").ok());

static TEST_CASE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(it|test)(\.each\([^)]*\))?\s*\(").ok());

fn truncate(code: &str) -> &str {
    match code.char_indices().nth(MAX_PROMPT_CODE_CHARS) {
        Some((index, _)) => &code[..index],
        None => code,
    }
}

pub(crate) fn test_prompt(spec: &TestGeneration) -> String {
    format!(
        "Generate comprehensive {kind} tests for the following {language} code.\n\n\
         ```{language}\n{code}\n```\n\n\
         REQUIREMENTS:\n\
         1. Use the idiomatic test framework for {language}\n\
         2. Mock external dependencies appropriately\n\
         3. Test edge cases and error conditions\n\
         4. Ensure tests are deterministic and reliable\n\n\
         GENERATE: Complete test file with imports, setup, and test cases.\n",
        kind = spec.kind,
        language = spec.language,
        code = truncate(&spec.payload),
    )
}

pub(crate) fn fix_prompt(fix: &ErrorFix) -> String {
    let context = fix.context();
    let mut prompt = format!(
        "Fix the following {} error ({} severity).\n\nERROR: {}\nFILE: {}\n",
        fix.error_type(),
        fix.severity(),
        fix.message(),
        context.file_path,
    );

    if let Some(line) = context.line_number {
        prompt.push_str(&format!("LINE: {}\n", line));
    }
    if let Some(function) = &context.function_name {
        prompt.push_str(&format!("FUNCTION: {}\n", function));
    }
    if let Some(class) = &context.class_name {
        prompt.push_str(&format!("CLASS: {}\n", class));
    }
    if let Some(code) = &context.surrounding_code {
        prompt.push_str(&format!("\nCODE:\n```\n{}\n```\n", truncate(code)));
    }

    prompt.push_str("\nRespond with the corrected code only.\n");
    prompt
}

/// Strips markdown code fences from generated text
pub fn clean_generated(text: &str) -> String {
    let cleaned = match FENCE.as_ref() {
        Some(fence) => fence.replace_all(text, "").into_owned(),
        None => text.replace("```", ""),
    };
    cleaned.trim().to_string()
}

/// Counts `it(...)` / `test(...)` cases in generated test code
pub fn count_test_cases(code: &str) -> u32 {
    TEST_CASE
        .as_ref()
        .map_or(0, |re| re.find_iter(code).count() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::classifier::ErrorClassifier;
    use relay_core::domain::error_fix::ErrorContext;
    use relay_core::domain::job::TestKind;

    #[test]
    fn test_clean_generated_strips_fences() {
        let raw = "```typescript\nit('a', () => {});\n```\n";
        assert_eq!(clean_generated(raw), "it('a', () => {});");
        assert_eq!(clean_generated("  plain  "), "plain");
    }

    #[test]
    fn test_count_test_cases() {
        let code = "describe('x', () => {\n  it('a', () => {});\n  test('b', () => {});\n  it.each([1])('c', () => {});\n});";
        assert_eq!(count_test_cases(code), 3);
    }

    #[test]
    fn test_prompt_truncates_payload() {
        let spec = TestGeneration {
            payload: "x".repeat(5000),
            language: "typescript".to_string(),
            kind: TestKind::Unit,
        };
        let prompt = test_prompt(&spec);
        assert!(prompt.contains("unit tests for the following typescript code"));
        assert!(prompt.len() < 2500);
    }

    #[test]
    fn test_fix_prompt_includes_context() {
        let fix = ErrorClassifier::new().assess(
            "Missing semicolon",
            ErrorContext::new("src/a.js")
                .with_position(12, Some(4))
                .with_surrounding_code("let a = 1"),
        );
        let prompt = fix_prompt(&fix);
        assert!(prompt.contains("FILE: src/a.js"));
        assert!(prompt.contains("LINE: 12"));
        assert!(prompt.contains("let a = 1"));
    }
}
