use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Fields of the agent's `--output-format stream-json` lines that plan
/// capture needs. Unknown message types are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    #[serde(rename = "system")]
    System {
        subtype: String,
        #[serde(default)]
        model: Option<String>,
    },
    #[serde(rename = "assistant")]
    Assistant { message: Value },
    #[serde(rename = "user")]
    User {
        #[serde(default)]
        message: Value,
        #[serde(default)]
        tool_use_result: Option<Value>,
    },
    #[serde(rename = "result")]
    Result {
        subtype: String,
        #[serde(default)]
        error: Option<String>,
        #[serde(default, rename = "result")]
        result_text: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// The agent's report after writing its plan file.
static FILE_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)File created successfully at:\s*(\S+\.md)").unwrap()
});

/// Everything a finished session said about its plan.
#[derive(Debug, Default)]
pub struct Transcript {
    /// Markdown files the agent reported creating, in order.
    pub created_files: Vec<PathBuf>,
    /// `plan` input of the last `ExitPlanMode` tool call.
    pub exit_plan: Option<String>,
    pub result_subtype: Option<String>,
    pub result_error: Option<String>,
    pub result_text: Option<String>,
    pub model: Option<String>,
}

impl Transcript {
    /// Plan text, from the first source that has one: a reported plan file
    /// that still exists, the `ExitPlanMode` input, then the final result text.
    pub fn plan_text(&self) -> Option<String> {
        let from_file = self.created_files.iter().find_map(|path| read_plan_file(path));
        from_file
            .or_else(|| non_blank(self.exit_plan.as_deref()))
            .or_else(|| non_blank(self.result_text.as_deref()))
    }

    fn absorb(&mut self, msg: StreamMessage) {
        match msg {
            StreamMessage::System { model, .. } => {
                if model.is_some() {
                    self.model = model;
                }
            }
            StreamMessage::Assistant { message } => {
                for block in content_blocks(&message) {
                    let is_exit_plan = block.get("type").and_then(Value::as_str) == Some("tool_use")
                        && block.get("name").and_then(Value::as_str) == Some("ExitPlanMode");
                    if !is_exit_plan {
                        continue;
                    }
                    if let Some(plan) = block.pointer("/input/plan").and_then(Value::as_str) {
                        self.exit_plan = Some(plan.to_string());
                    }
                }
            }
            StreamMessage::User {
                message,
                tool_use_result,
            } => {
                let mut texts = Vec::new();
                for block in content_blocks(&message) {
                    if block.get("type").and_then(Value::as_str) == Some("tool_result") {
                        collect_text(block.get("content"), &mut texts);
                    }
                }
                collect_text(tool_use_result.as_ref(), &mut texts);
                for text in texts {
                    for caps in FILE_CREATED.captures_iter(&text) {
                        let path = PathBuf::from(&caps[1]);
                        if !self.created_files.contains(&path) {
                            self.created_files.push(path);
                        }
                    }
                }
            }
            StreamMessage::Result {
                subtype,
                error,
                result_text,
            } => {
                self.result_subtype = Some(subtype);
                self.result_error = error;
                self.result_text = result_text;
            }
            StreamMessage::Unknown => {}
        }
    }
}

/// Reads stream-json line by line, optionally teeing raw lines to a file.
pub struct StreamMonitor<R> {
    reader: R,
    tee_writer: Option<std::io::BufWriter<std::fs::File>>,
}

impl<R: AsyncBufRead + Unpin> StreamMonitor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tee_writer: None,
        }
    }

    /// Tee raw lines to `path`, truncating it. Best-effort: if the file
    /// can't be opened, tee is skipped.
    pub fn with_tee(mut self, path: Option<&Path>) -> Self {
        if let Some(p) = path {
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match std::fs::File::create(p) {
                Ok(file) => self.tee_writer = Some(std::io::BufWriter::new(file)),
                Err(e) => tracing::warn!(path = %p.display(), error = %e, "cannot open transcript, not capturing"),
            }
        }
        self
    }

    /// Read until EOF.
    pub async fn run(&mut self) -> Result<Transcript> {
        let mut transcript = Transcript::default();
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                break;
            }
            if let Some(w) = self.tee_writer.as_mut() {
                let _ = w.write_all(line.as_bytes());
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // non-JSON lines are stray debug output
            if let Ok(msg) = serde_json::from_str::<StreamMessage>(trimmed) {
                transcript.absorb(msg);
            }
        }
        if let Some(w) = self.tee_writer.as_mut() {
            let _ = w.flush();
        }
        Ok(transcript)
    }
}

fn content_blocks(message: &Value) -> impl Iterator<Item = &Value> {
    message
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Tool results carry text either as a bare string or as `[{"text": ...}]`.
fn collect_text(value: Option<&Value>, out: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) => out.push(s.clone()),
        Some(Value::Array(items)) => {
            for item in items {
                collect_text(Some(item), out);
            }
        }
        Some(Value::Object(map)) => {
            for key in ["text", "content", "stdout"] {
                collect_text(map.get(key), out);
            }
        }
        _ => {}
    }
}

fn read_plan_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "reported plan file unreadable");
            None
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}
