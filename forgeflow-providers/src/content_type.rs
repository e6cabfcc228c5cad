//! ABOUTME: Classifies the first user message of a completion so the
//! ABOUTME: continuation engine can pick overlap sizing and join strategy

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Code,
    Json,
    Diff,
    JsonCode,
    Text,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Code => "code",
            ContentType::Json => "json",
            ContentType::Diff => "diff",
            ContentType::JsonCode => "json_code",
            ContentType::Text => "text",
        };
        f.write_str(s)
    }
}

impl ContentType {
    /// True for the two content types whose continuation artifacts
    /// (split string literals, dangling `+` concatenation) get a
    /// post-join repair pass.
    pub fn repairs_artifacts(self) -> bool {
        matches!(self, ContentType::Code | ContentType::JsonCode)
    }

    /// True for the content types the LLM-assisted splice strategy is
    /// allowed to run on — plain prose never needs a model call to join.
    pub fn allows_llm_splice(self) -> bool {
        matches!(
            self,
            ContentType::Code | ContentType::Json | ContentType::JsonCode | ContentType::Diff
        )
    }
}

/// Classifies the first user message's content based on the markers it
/// contains. Code fences or a `def ` signature plus JSON-ish braces means
/// `json_code` (JSON embedded in a code block); precedence is
/// `json_code → code → json → diff → text`, matching the original's
/// `_detect_content_type`.
pub fn detect_content_type(first_user_message: &str) -> ContentType {
    let has_code_markers =
        first_user_message.contains("```") || first_user_message.contains("def ");
    let has_diff_markers =
        first_user_message.contains("--- ") && first_user_message.contains("+++ ");
    let trimmed = first_user_message.trim_start();
    let has_json_markers = trimmed.starts_with('{')
        || trimmed.starts_with('[')
        || first_user_message.to_lowercase().contains("json");

    match (has_code_markers, has_json_markers, has_diff_markers) {
        (true, true, _) => ContentType::JsonCode,
        (false, true, _) => ContentType::Json,
        (true, false, _) => ContentType::Code,
        (_, _, true) => ContentType::Diff,
        _ => ContentType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_code() {
        assert_eq!(
            detect_content_type("```python\ndef foo():\n    pass\n```"),
            ContentType::Code
        );
    }

    #[test]
    fn detects_json_code_when_both_markers_present() {
        let msg = "```json\n{\"a\": 1}\n```\nRespond with json only";
        assert_eq!(detect_content_type(msg), ContentType::JsonCode);
    }

    #[test]
    fn detects_diff() {
        let msg = "--- a/file.py\n+++ b/file.py\n@@ -1,2 +1,2 @@\n";
        assert_eq!(detect_content_type(msg), ContentType::Diff);
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(detect_content_type("Summarize this document."), ContentType::Text);
    }

    #[test]
    fn detects_bare_json_object_without_the_word_json() {
        assert_eq!(detect_content_type("{\"a\": 1, \"b\": 2}"), ContentType::Json);
    }

    #[test]
    fn detects_bare_json_array_without_the_word_json() {
        assert_eq!(detect_content_type("[1, 2, 3]"), ContentType::Json);
    }

    #[test]
    fn detects_json_from_the_word_json_alone_with_no_braces() {
        assert_eq!(detect_content_type("Please respond in JSON only."), ContentType::Json);
    }

    #[test]
    fn code_with_a_lone_dash_marker_is_not_misclassified_as_diff() {
        let msg = "```python\ndef foo():\n    return 1\n--- not a real diff\n```";
        assert_eq!(detect_content_type(msg), ContentType::Code);
    }
}
