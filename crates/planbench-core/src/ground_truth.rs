use crate::diff;
use crate::types::GroundTruth;
use regex::Regex;
use std::sync::LazyLock;

/// Longest first message line still accepted as a key addition.
pub const SUMMARY_LINE_MAX_CHARS: usize = 200;

pub const MAX_KEY_ADDITIONS: usize = 5;

/// A fixed label appended to `key_additions` when its predicate fires on
/// `(diff, message)`.
pub struct KeywordTrigger {
    pub label: &'static str,
    pub fires: fn(&str, &str) -> bool,
}

pub const KEY_ADDITION_TRIGGERS: &[KeywordTrigger] = &[
    KeywordTrigger {
        label: "retry logic",
        fires: mentions_retry,
    },
    KeywordTrigger {
        label: "constant",
        fires: mentions_constant,
    },
    KeywordTrigger {
        label: "tests",
        fires: adds_tests,
    },
];

static TEST_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\+\s*(?:def test|it\(|test\(|describe\(|#\[test\]|fn test_|func Test)").unwrap()
});

fn mentions_retry(diff: &str, message: &str) -> bool {
    diff.to_lowercase().contains("retry") || message.to_lowercase().contains("retry")
}

fn mentions_constant(diff: &str, _message: &str) -> bool {
    diff.to_lowercase().contains("constant") || diff.contains("CONST") || diff.contains("MAX_")
}

fn adds_tests(diff: &str, _message: &str) -> bool {
    diff.to_lowercase().contains("test") && TEST_DEFINITION.is_match(diff)
}

/// Derive the answer key for a merge from its cumulative diff and combined
/// message.
pub fn extract(diff_text: &str, message: &str) -> GroundTruth {
    let (files_modified, files_created) = diff::parse_files(diff_text);
    GroundTruth {
        files_modified,
        files_created,
        key_additions: key_additions(diff_text, message),
        libraries_added: diff::parse_added_dependencies(diff_text),
    }
}

/// Best-effort summary phrases: the message's first line, then any trigger
/// labels, capped at [`MAX_KEY_ADDITIONS`].
pub fn key_additions(diff_text: &str, message: &str) -> Vec<String> {
    let mut out = Vec::new();
    let first_line = message.lines().next().unwrap_or("").trim();
    if !first_line.is_empty() && first_line.chars().count() < SUMMARY_LINE_MAX_CHARS {
        out.push(first_line.to_string());
    }
    for trigger in KEY_ADDITION_TRIGGERS {
        if (trigger.fires)(diff_text, message) {
            out.push(trigger.label.to_string());
        }
    }
    out.truncate(MAX_KEY_ADDITIONS);
    out
}
