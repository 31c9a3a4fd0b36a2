//! In-memory oracles for tests: canned replies, simulated outages, and a
//! record of every request.

use crate::{JudgeOracle, OracleError, SearchOracle};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Scripted = Result<String, String>;

/// Judge oracle answering from a script.
///
/// A reply registered with [`ScriptedJudge::on`] answers every call with
/// that label; otherwise queued replies are consumed in order. An empty
/// queue behaves as an outage.
#[derive(Debug, Default)]
pub struct ScriptedJudge {
    by_label: HashMap<String, Scripted>,
    queue: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn fail_next(self, reason: impl Into<String>) -> Self {
        self.push(Err(reason.into()))
    }

    pub fn on(mut self, label: &str, text: impl Into<String>) -> Self {
        self.by_label.insert(label.to_string(), Ok(text.into()));
        self
    }

    pub fn fail_on(mut self, label: &str, reason: impl Into<String>) -> Self {
        self.by_label.insert(label.to_string(), Err(reason.into()));
        self
    }

    fn push(self, item: Scripted) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
        self
    }

    /// `(label, prompt)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, label: &str) -> usize {
        self.calls().iter().filter(|(l, _)| l == label).count()
    }
}

impl JudgeOracle for ScriptedJudge {
    fn model(&self) -> &str {
        "scripted"
    }

    fn complete(&self, label: &str, prompt: &str, _max_tokens: u32) -> Result<String, OracleError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((label.to_string(), prompt.to_string()));
        }
        let next = match self.by_label.get(label) {
            Some(fixed) => Some(fixed.clone()),
            None => self.queue.lock().ok().and_then(|mut q| q.pop_front()),
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(OracleError::Transport(reason)),
            None => Err(OracleError::Transport(format!("no scripted reply for {label}"))),
        }
    }
}

/// Search oracle returning the same snippets for every query.
#[derive(Debug, Default)]
pub struct ScriptedSearch {
    results: Vec<String>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn with_results<I, S>(results: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: results.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl SearchOracle for ScriptedSearch {
    fn search(&self, query: &str, top_n: usize) -> Result<Vec<String>, OracleError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.failing {
            return Err(OracleError::Status {
                status: 429,
                body: "rate limited".into(),
            });
        }
        Ok(self.results.iter().take(top_n).cloned().collect())
    }
}
