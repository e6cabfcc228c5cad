//! ABOUTME: Overlap-window sizing and the marker-based continuation prompt
//! ABOUTME: protocol used to ask the model to repeat tail context before continuing

use crate::content_type::ContentType;

pub const BEGIN_MARKER: &str = "---BEGIN_EXACT_OVERLAP---";
pub const END_MARKER: &str = "---END_EXACT_OVERLAP---";

/// Picks how many trailing lines of the previous chunk to show the model as
/// overlap context, following the adaptive sizing rules per content type.
/// Code/JSON-in-code gets a larger window when the tail looks like it ends
/// mid-string (an open quote, f-string, or triple-quote), since a smaller
/// window would risk splitting the model's view of the unterminated
/// literal.
pub fn overlap_line_count(content_type: ContentType, lines: &[&str]) -> usize {
    let total = lines.len();
    if total == 0 {
        return 0;
    }
    let base = match content_type {
        ContentType::Code | ContentType::JsonCode => {
            (5usize.max((total / 3).min(15))).min(total)
        }
        ContentType::Json | ContentType::Diff => (8usize.max((total / 3).min(20))).min(total),
        ContentType::Text => (3usize.max((total / 4).min(10))).min(total),
    };

    if matches!(content_type, ContentType::Code | ContentType::JsonCode) {
        let tail = &lines[total.saturating_sub(base)..];
        if tail_looks_unterminated(tail) {
            return (15usize.max((total / 2).min(30))).min(total);
        }
    }
    base
}

/// Heuristic for "the overlap window cuts through an open string literal":
/// odd counts of unescaped single/double quotes, or an odd count of triple
/// quotes, in the tail lines taken together.
fn tail_looks_unterminated(tail: &[&str]) -> bool {
    let joined = tail.join("\n");
    let triple_double = joined.matches("\"\"\"").count();
    let triple_single = joined.matches("'''").count();
    if triple_double % 2 == 1 || triple_single % 2 == 1 {
        return true;
    }
    let double_quotes = count_unescaped(&joined, '"');
    let single_quotes = count_unescaped(&joined, '\'');
    double_quotes % 2 == 1 || single_quotes % 2 == 1
}

fn count_unescaped(text: &str, quote: char) -> usize {
    let mut count = 0;
    let mut prev_was_backslash = false;
    for ch in text.chars() {
        if ch == quote && !prev_was_backslash {
            count += 1;
        }
        prev_was_backslash = ch == '\\' && !prev_was_backslash;
    }
    count
}

/// Returns the last `n` lines of `text` joined back with newlines.
pub fn last_n_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Builds the continuation request prompt: asks the model to first repeat
/// the overlap block verbatim between the begin/end markers, then continue
/// past it. Wording is tailored per content type so the model understands
/// what "exact" means for that kind of content.
pub fn create_continuation_prompt(content_type: ContentType, overlap_text: &str) -> String {
    let instruction = match content_type {
        ContentType::Code | ContentType::JsonCode => {
            "Repeat the exact code shown below character-for-character (including whitespace and \
             indentation), then continue the code from exactly where it left off. Do not add \
             explanation, only code."
        }
        ContentType::Json => {
            "Repeat the exact JSON fragment shown below character-for-character, then continue \
             the JSON from exactly where it left off. Do not add explanation, only JSON."
        }
        ContentType::Diff => {
            "Repeat the exact diff hunk shown below character-for-character, then continue the \
             diff from exactly where it left off. Do not add explanation, only diff content."
        }
        ContentType::Text => {
            "Repeat the exact text shown below word-for-word, then continue the text from \
             exactly where it left off."
        }
    };

    format!(
        "{instruction}\n\n{BEGIN_MARKER}\n{overlap_text}\n{END_MARKER}\n\nContinue from here:"
    )
}

/// Strips the marker-delimited echo from a continuation response, returning
/// the content that follows `END_MARKER`. If both markers are present in
/// order, the match is unambiguous and the response is trusted as-is. If
/// they appear out of order or only one is present, the response is
/// returned unchanged so the caller falls through to the next join
/// strategy rather than silently truncating good content.
pub fn strip_overlap_markers(response: &str) -> Option<String> {
    let begin_idx = response.find(BEGIN_MARKER);
    let end_idx = response.find(END_MARKER);
    match (begin_idx, end_idx) {
        (Some(b), Some(e)) if e > b => {
            let after_end = e + END_MARKER.len();
            Some(response[after_end..].trim_start_matches('\n').to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_window_for_short_text_content() {
        let lines: Vec<&str> = "one\ntwo\nthree".lines().collect();
        assert_eq!(overlap_line_count(ContentType::Text, &lines), 3);
    }

    #[test]
    fn expands_code_window_on_unterminated_string_tail() {
        let text = "a = 1\nb = 2\nc = \"unterminated".to_string();
        let lines: Vec<&str> = text.lines().collect();
        let n = overlap_line_count(ContentType::Code, &lines);
        assert!(n >= 3);
    }

    #[test]
    fn strips_markers_when_both_present_in_order() {
        let response = format!("{BEGIN_MARKER}\noverlap text\n{END_MARKER}\nnew content here");
        assert_eq!(strip_overlap_markers(&response).unwrap(), "new content here");
    }

    #[test]
    fn returns_none_when_markers_missing() {
        assert!(strip_overlap_markers("just new content").is_none());
    }

    #[test]
    fn returns_none_when_markers_out_of_order() {
        let response = format!("{END_MARKER}\n...\n{BEGIN_MARKER}");
        assert!(strip_overlap_markers(&response).is_none());
    }
}
