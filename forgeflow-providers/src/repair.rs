//! ABOUTME: Post-join artifact repair for code/json_code continuations —
//! ABOUTME: fixes string literals and bracket placement split across the join point

use regex::Regex;
use std::sync::OnceLock;

struct RepairRule {
    pattern: &'static str,
    replacement: &'static str,
}

static RULES: &[RepairRule] = &[
    // A string literal closed then immediately reopened across a join, e.g.
    // `"abc"\n"def"` where the two were one literal split by the join point.
    RepairRule {
        pattern: r#""\s*\n\s*""#,
        replacement: "",
    },
    RepairRule {
        pattern: r"'\s*\n\s*'",
        replacement: "",
    },
    // `+`-concatenation split across the join: `"abc" +\n"def"` collapses to
    // one line so the concatenation reads as originally written.
    RepairRule {
        pattern: r"\+\s*\n\s*",
        replacement: " + ",
    },
    // A newline immediately after an opening bracket/brace/paren, or
    // immediately before a closing one, introduced by the join rather than
    // by the model's own formatting.
    RepairRule {
        pattern: r"([\[{(])\n+",
        replacement: "$1",
    },
    RepairRule {
        pattern: r"\n+([\]})])",
        replacement: "$1",
    },
];

fn compiled_rules() -> &'static Vec<(Regex, &'static str)> {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| (Regex::new(rule.pattern).unwrap(), rule.replacement))
            .collect()
    })
}

/// Applies the fix-up rules in order, returning the repaired text and how
/// many rules actually matched something (used to bump the
/// `structure_repairs` diagnostic counter).
pub fn repair_artifacts(text: &str) -> (String, u32) {
    let mut result = text.to_string();
    let mut repairs = 0u32;
    for (re, replacement) in compiled_rules() {
        if re.is_match(&result) {
            repairs += 1;
            result = re.replace_all(&result, *replacement).into_owned();
        }
    }
    (result, repairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_string_literal_split_by_join() {
        let (fixed, repairs) = repair_artifacts("\"abc\"\n\"def\"");
        assert_eq!(fixed, "\"abcdef\"");
        assert!(repairs >= 1);
    }

    #[test]
    fn collapses_concatenation_split_across_lines() {
        let (fixed, _) = repair_artifacts("\"abc\" +\n\"def\"");
        assert_eq!(fixed, "\"abc\" + \"def\"");
    }

    #[test]
    fn removes_newline_after_opening_bracket() {
        let (fixed, _) = repair_artifacts("[\n1, 2, 3]");
        assert_eq!(fixed, "[1, 2, 3]");
    }

    #[test]
    fn leaves_clean_code_untouched() {
        let source = "def foo():\n    return 1\n";
        let (fixed, repairs) = repair_artifacts(source);
        assert_eq!(fixed, source);
        assert_eq!(repairs, 0);
    }
}
