use regex::Regex;
use std::sync::LazyLock;

/// Secret patterns stripped from anything written to the call log.
static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Anthropic / OpenAI style keys: sk-ant-..., sk-...
        (
            Regex::new(r"\b(sk-[a-zA-Z0-9_-]{20,})").unwrap(),
            "[REDACTED_API_KEY]",
        ),
        // GitHub tokens, which show up in clone URLs
        (
            Regex::new(r"\b(ghp_[a-zA-Z0-9]{36,}|github_pat_[a-zA-Z0-9_]{22,})").unwrap(),
            "[REDACTED_GITHUB_TOKEN]",
        ),
        (
            Regex::new(r"(?i)(Bearer\s+)[a-zA-Z0-9._\-]{20,}").unwrap(),
            "${1}[REDACTED_BEARER]",
        ),
        // Header or env assignments: x-api-key: ..., X-Subscription-Token=...
        (
            Regex::new(r"(?i)\b((?:x-api-key|x-subscription-token|[A-Z_]*API_KEY)\s*[:=]\s*)\S+").unwrap(),
            "${1}[REDACTED]",
        ),
    ]
});

pub fn redact_secrets(input: &str) -> String {
    let mut output = input.to_string();
    for (pat, replacement) in SECRET_PATTERNS.iter() {
        output = pat.replace_all(&output, *replacement).to_string();
    }
    output
}

/// Redact every string inside a JSON value, in place.
pub fn redact_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = redact_secrets(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_value),
        serde_json::Value::Object(map) => map.values_mut().for_each(redact_value),
        _ => {}
    }
}
