//! Per-run record of every oracle exchange, one pretty JSON file per call.

use crate::redact::redact_value;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Serialize)]
pub struct LlmCallRecord<'a> {
    pub call_type: &'a str,
    pub timestamp: String,
    pub model: &'a str,
    pub prompt: &'a str,
    pub response: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SearchRecord<'a> {
    pub query: &'a str,
    pub result: &'a str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Writes oracle call records under `logs/<run_id>/`. Write failures are
/// logged and swallowed.
#[derive(Debug)]
pub struct CallLog {
    dir: PathBuf,
    seq: AtomicU64,
}

impl CallLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_llm(
        &self,
        call_type: &str,
        model: &str,
        prompt: &str,
        response: &str,
        max_tokens: u32,
        extra: Option<serde_json::Value>,
    ) -> Option<PathBuf> {
        let record = LlmCallRecord {
            call_type,
            timestamp: now_rfc3339(),
            model,
            prompt,
            response,
            max_tokens,
            extra,
        };
        let name = format!("llm_{}_{}.json", safe_filename(call_type, 40), self.stamp());
        self.write(&name, &record)
    }

    pub fn log_search(
        &self,
        query: &str,
        result: &str,
        extra: Option<serde_json::Value>,
    ) -> Option<PathBuf> {
        let record = SearchRecord {
            query,
            result,
            timestamp: now_rfc3339(),
            extra,
        };
        let head: String = query.chars().take(60).collect();
        let name = format!("search_{}_{}.json", safe_filename(&head, 50), self.stamp());
        self.write(&name, &record)
    }

    /// `YYYYMMDD_HHMMSS_<seq>`: second resolution plus a per-log counter so
    /// calls within one second don't overwrite each other.
    fn stamp(&self) -> String {
        let now = time::OffsetDateTime::now_utc();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{:04}{:02}{:02}_{:02}{:02}{:02}_{seq:04}",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
        )
    }

    fn write<T: Serialize>(&self, name: &str, record: &T) -> Option<PathBuf> {
        let path = self.dir.join(name);
        match try_write(&path, record) {
            Ok(()) => Some(path),
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "failed to write oracle call log");
                None
            }
        }
    }
}

fn try_write<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    let mut value = serde_json::to_value(record)?;
    redact_value(&mut value);
    let data = serde_json::to_string_pretty(&value)?;
    planbench_store::write_atomic(path, data.as_bytes())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Filesystem-safe slug: word chars kept, runs of space/dash become `_`.
pub fn safe_filename(s: &str, max_len: usize) -> String {
    let kept: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .take(max_len)
        .collect();
    let mut slug = String::with_capacity(kept.len());
    let mut pending_sep = false;
    for c in kept.trim().chars() {
        if c == '-' || c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('_');
        }
        pending_sep = false;
        slug.push(c);
    }
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}
