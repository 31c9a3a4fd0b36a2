//! Judge and search oracles: the untrusted external services consulted by
//! task generation and plan grading.
//!
//! Every call goes through [`ask`], which turns transport failures and
//! unparseable replies into an explicit [`OracleReply`] so each stage can
//! apply its own fallback.

pub mod anthropic;
pub mod brave;
pub mod call_log;
pub mod redact;
pub mod reply;
pub mod scripted;
pub mod templates;

pub use anthropic::AnthropicJudge;
pub use brave::BraveSearch;
pub use call_log::CallLog;
pub use reply::{OracleReply, ReplyParser};
pub use scripted::{ScriptedJudge, ScriptedSearch};
pub use templates::{Prompt, Templates};

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<ureq::Error> for OracleError {
    fn from(e: ureq::Error) -> Self {
        OracleError::Transport(e.to_string())
    }
}

/// A language model answering one prompt per call.
pub trait JudgeOracle: Send + Sync {
    fn model(&self) -> &str;

    /// `label` names the calling stage in logs.
    fn complete(&self, label: &str, prompt: &str, max_tokens: u32) -> Result<String, OracleError>;
}

/// A web search backend. An empty result is a valid outcome.
pub trait SearchOracle: Send + Sync {
    fn search(&self, query: &str, top_n: usize) -> Result<Vec<String>, OracleError>;
}

/// Judge used when no credential is configured: every call is an outage, so
/// each stage lands on its fallback.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredJudge {
    pub credential: &'static str,
}

impl JudgeOracle for UnconfiguredJudge {
    fn model(&self) -> &str {
        "unconfigured"
    }

    fn complete(&self, _label: &str, _prompt: &str, _max_tokens: u32) -> Result<String, OracleError> {
        Err(OracleError::MissingCredential(self.credential))
    }
}

/// Call the judge and parse its reply with `parser`.
pub fn ask<P: ReplyParser>(
    judge: &dyn JudgeOracle,
    label: &str,
    prompt: &str,
    max_tokens: u32,
    parser: &P,
) -> OracleReply<P::Output> {
    match judge.complete(label, prompt, max_tokens) {
        Ok(text) => match parser.parse(&text) {
            Some(value) => OracleReply::Ok(value),
            None => OracleReply::Malformed(text),
        },
        Err(e) => OracleReply::Unavailable(e.to_string()),
    }
}
