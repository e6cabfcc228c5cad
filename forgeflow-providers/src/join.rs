//! ABOUTME: The five-strategy ladder for stitching a continuation response
//! ABOUTME: onto the previous chunk, from cheapest/most-certain to most-expensive

use crate::content_type::ContentType;
use crate::diagnostics::ContinuationDiagnostics;
use crate::overlap::strip_overlap_markers;
use async_trait::async_trait;
use md5::{Digest, Md5};
use regex::Regex;
use std::sync::OnceLock;

/// An LLM call used only by the splice strategy, kept behind a trait so the
/// join ladder doesn't need to know about providers or transports.
#[async_trait]
pub trait SpliceCompletion: Send + Sync {
    async fn complete_splice(&self, prompt: String) -> Result<String, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    MarkerStrip,
    ExactLineMatch,
    HashWindow,
    TokenLcs,
    LlmSplice,
    BasicJoin,
}

/// Stitches `current` (a continuation response) onto `previous` (everything
/// accumulated so far), trying cheaper and more certain strategies before
/// falling back to the syntax-aware basic join. `overlap_text` is the
/// window of `previous` the model was asked to echo back, used by the
/// exact-line and hash-window strategies to recognize where the echo ends.
pub async fn join_with_overlap(
    content_type: ContentType,
    previous: &str,
    current: &str,
    overlap_text: &str,
    splice: Option<&dyn SpliceCompletion>,
    diagnostics: &mut ContinuationDiagnostics,
) -> String {
    diagnostics.attempts += 1;

    if let Some(stripped) = strip_overlap_markers(current) {
        return format!("{previous}\n{stripped}");
    }

    if let Some(joined) = try_exact_line_match(previous, current, overlap_text) {
        diagnostics.exact_matches += 1;
        return joined;
    }

    if let Some(joined) = try_hash_window(content_type, previous, current, overlap_text) {
        diagnostics.hash_matches += 1;
        return joined;
    }

    if let Some(joined) = try_token_lcs(previous, current) {
        diagnostics.token_matches += 1;
        return joined;
    }

    if content_type.allows_llm_splice() {
        if let Some(splice) = splice {
            if let Some(joined) = try_llm_splice(content_type, previous, current, splice).await {
                diagnostics.llm_joins += 1;
                return joined;
            }
        }
    }

    diagnostics.fallbacks += 1;
    basic_join(content_type, previous, current)
}

fn try_exact_line_match(previous: &str, current: &str, overlap_text: &str) -> Option<String> {
    let overlap_lines: Vec<&str> = overlap_text.lines().collect();
    if overlap_lines.is_empty() {
        return None;
    }
    let current_lines: Vec<&str> = current.lines().collect();
    if current_lines.len() < overlap_lines.len() {
        return None;
    }
    if current_lines[..overlap_lines.len()] == overlap_lines[..] {
        let remainder = current_lines[overlap_lines.len()..].join("\n");
        return Some(format!("{previous}\n{remainder}"));
    }
    None
}

fn normalize(text: &str, lowercase_too: bool) -> String {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if lowercase_too {
        stripped.to_lowercase()
    } else {
        stripped
    }
}

fn md5_hex(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Scans the first 20 line-positions of `current` for a window whose
/// whitespace-normalized hash matches the overlap text's hash. Text content
/// is also lowercased before hashing, since prose echoes are more likely to
/// vary in case than code.
fn try_hash_window(
    content_type: ContentType,
    previous: &str,
    current: &str,
    overlap_text: &str,
) -> Option<String> {
    let lowercase_too = matches!(content_type, ContentType::Text);
    let overlap_hash = md5_hex(&normalize(overlap_text, lowercase_too));
    let window_len = overlap_text.lines().count().max(1);

    let current_lines: Vec<&str> = current.lines().collect();
    let scan_limit = 20.min(current_lines.len().saturating_sub(window_len) + 1);
    for start in 0..scan_limit {
        let end = start + window_len;
        if end > current_lines.len() {
            break;
        }
        let window = current_lines[start..end].join("\n");
        if md5_hex(&normalize(&window, lowercase_too)) == overlap_hash {
            let remainder = current_lines[end..].join("\n");
            return Some(format!("{previous}\n{remainder}"));
        }
    }
    None
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+|[^\w\s]").unwrap())
}

fn tokenize(text: &str) -> Vec<&str> {
    token_regex().find_iter(text).map(|m| m.as_str()).collect()
}

/// Finds the longest run of matching tokens (minimum 5) between the tail of
/// `previous` and the head of `current`, and joins at the approximate
/// character offset in `current` where that run ends.
fn try_token_lcs(previous: &str, current: &str) -> Option<String> {
    const MIN_TOKENS: usize = 5;
    let prev_tail = tail_chars(previous, 1000);
    let curr_head = head_chars(current, 1000);

    let prev_tokens = tokenize(&prev_tail);
    let curr_tokens = tokenize(&curr_head);
    if prev_tokens.len() < MIN_TOKENS || curr_tokens.len() < MIN_TOKENS {
        return None;
    }

    let mut best_len = 0usize;
    let mut best_curr_end_token = 0usize;
    for i in 0..prev_tokens.len() {
        for j in 0..curr_tokens.len() {
            let mut k = 0;
            while i + k < prev_tokens.len()
                && j + k < curr_tokens.len()
                && prev_tokens[i + k] == curr_tokens[j + k]
            {
                k += 1;
            }
            if k > best_len {
                best_len = k;
                best_curr_end_token = j + k;
            }
        }
    }

    if best_len < MIN_TOKENS {
        return None;
    }

    let char_offset = token_char_offset(&curr_head, best_curr_end_token);
    let remainder = &current[char_offset.min(current.len())..];
    Some(format!("{previous}\n{}", remainder.trim_start_matches('\n')))
}

fn token_char_offset(text: &str, token_count: usize) -> usize {
    let mut count = 0;
    for m in token_regex().find_iter(text) {
        count += 1;
        if count == token_count {
            return m.end();
        }
    }
    text.len()
}

fn tail_chars(text: &str, n: usize) -> String {
    let len = text.chars().count();
    let skip = len.saturating_sub(n);
    text.chars().skip(skip).collect()
}

fn head_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

async fn try_llm_splice(
    content_type: ContentType,
    previous: &str,
    current: &str,
    splice: &dyn SpliceCompletion,
) -> Option<String> {
    let prev_tail = tail_chars(previous, 300);
    let curr_head = head_chars(current, 300);
    let instruction = match content_type {
        ContentType::Code | ContentType::JsonCode => {
            "Join these two code fragments into one continuous, syntactically valid fragment. \
             Output only the joined code, no commentary, no markdown fences."
        }
        ContentType::Json => {
            "Join these two JSON fragments into one continuous, valid JSON fragment. Output \
             only the joined JSON, no commentary."
        }
        ContentType::Diff => {
            "Join these two diff fragments into one continuous unified diff. Output only the \
             joined diff, no commentary."
        }
        ContentType::Text => return None,
    };
    let prompt = format!(
        "{instruction}\n\n--- end of fragment one ---\n{prev_tail}\n\n--- start of fragment two ---\n{curr_head}"
    );

    let joined_fragment = splice.complete_splice(prompt).await.ok()?;
    let cleaned = strip_markdown_fence(&joined_fragment);

    let full_previous_len = previous.chars().count();
    let full_current_len = current.chars().count();
    let spliced_len = previous.len() - prev_tail.len() + cleaned.len() + current.len() - curr_head.len();
    let combined_len = full_previous_len + full_current_len;
    if (spliced_len as f64) < 0.8 * (combined_len as f64) {
        return None;
    }

    let prefix = &previous[..previous.len() - prev_tail.len()];
    let suffix = &current[curr_head.len()..];
    Some(format!("{prefix}{cleaned}{suffix}"))
}

fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(stripped) = trimmed.strip_prefix("```") {
        let without_lang = stripped
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or(stripped);
        without_lang.strip_suffix("```").unwrap_or(without_lang).trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// The final, syntax-aware fallback: no statistical match was found between
/// the two chunks, so join on surface syntax cues alone.
fn basic_join(content_type: ContentType, previous: &str, current: &str) -> String {
    let prev = previous.trim_end();
    let curr = current.trim_start();

    if matches!(content_type, ContentType::Code | ContentType::JsonCode) {
        if prev.ends_with(':') || prev.ends_with('{') || prev.ends_with('[') || prev.ends_with('(') {
            return format!("{prev}\n{curr}");
        }
        if prev.ends_with(',') && curr.starts_with(',') {
            return format!("{prev}\n{}", &curr[1..]);
        }
    }

    format!("{prev}\n{curr}")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSplice;
    #[async_trait]
    impl SpliceCompletion for NoopSplice {
        async fn complete_splice(&self, _prompt: String) -> Result<String, String> {
            Err("not called".into())
        }
    }

    #[tokio::test]
    async fn strips_markers_first_when_present() {
        let mut diag = ContinuationDiagnostics::default();
        let current = "---BEGIN_EXACT_OVERLAP---\noverlap\n---END_EXACT_OVERLAP---\nrest";
        let joined = join_with_overlap(
            ContentType::Text,
            "previous text",
            current,
            "overlap",
            None,
            &mut diag,
        )
        .await;
        assert_eq!(joined, "previous text\nrest");
    }

    #[tokio::test]
    async fn exact_line_match_strips_echoed_overlap() {
        let mut diag = ContinuationDiagnostics::default();
        let previous = "line1\nline2\nline3";
        let overlap = "line2\nline3";
        let current = "line2\nline3\nline4\nline5";
        let joined = join_with_overlap(ContentType::Text, previous, current, overlap, None, &mut diag).await;
        assert_eq!(joined, "line1\nline2\nline3\nline4\nline5");
        assert_eq!(diag.exact_matches, 1);
    }

    #[tokio::test]
    async fn hash_window_matches_after_whitespace_noise() {
        let mut diag = ContinuationDiagnostics::default();
        let previous = "a\nb\nc";
        let overlap = "b\nc";
        let current = "b  \n  c\nd\ne";
        let joined = join_with_overlap(ContentType::Code, previous, current, overlap, None, &mut diag).await;
        assert_eq!(joined, "a\nb\nc\nd\ne");
        assert_eq!(diag.hash_matches, 1);
    }

    #[tokio::test]
    async fn falls_back_to_basic_join_when_nothing_matches() {
        let mut diag = ContinuationDiagnostics::default();
        let previous = "def foo():";
        let current = "    return 1";
        let joined = join_with_overlap(ContentType::Code, previous, current, "unrelated overlap text", None, &mut diag).await;
        assert_eq!(joined, "def foo():\n    return 1");
        assert_eq!(diag.fallbacks, 1);
    }

    #[test]
    fn strip_markdown_fence_removes_wrapping_fence() {
        let text = "```python\nprint(1)\n```";
        assert_eq!(strip_markdown_fence(text), "print(1)");
    }
}
