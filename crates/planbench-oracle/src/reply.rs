//! Typed parsing of free-text oracle replies.
//!
//! Oracles answer in loose prose around a fixed-format marker line
//! (`TYPE:`, `PROMPT:`, `GRADE:`, ...). Each reply shape gets a parser that
//! extracts only the first matching token and declares the value its stage
//! falls back to.

use planbench_core::{ClaimStep, CommitCategory, Difficulty, Verdict};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Outcome of one oracle call.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply<T> {
    Ok(T),
    /// The oracle could not be reached (or was never configured).
    Unavailable(String),
    /// The oracle answered but the reply did not match the expected shape.
    Malformed(String),
}

impl<T> OracleReply<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, OracleReply::Ok(_))
    }

    /// Collapse to a value, applying the parser's fallback for non-Ok replies.
    pub fn resolve<P: ReplyParser<Output = T>>(self, parser: &P) -> T {
        match self {
            OracleReply::Ok(value) => value,
            OracleReply::Unavailable(reason) => {
                tracing::warn!(stage = parser.name(), %reason, "oracle unavailable, using fallback");
                parser.fallback()
            }
            OracleReply::Malformed(raw) => {
                tracing::warn!(
                    stage = parser.name(),
                    reply_len = raw.len(),
                    "oracle reply malformed, using fallback"
                );
                parser.recover(&raw)
            }
        }
    }
}

/// One reply shape: how to read it, and what to use when it can't be read.
pub trait ReplyParser {
    type Output;

    fn name(&self) -> &'static str;

    /// Extract the value from a reply; `None` marks it malformed.
    fn parse(&self, raw: &str) -> Option<Self::Output>;

    /// Neutral default for an unreachable oracle.
    fn fallback(&self) -> Self::Output;

    /// Value for a reply that arrived but did not parse.
    fn recover(&self, _raw: &str) -> Self::Output {
        self.fallback()
    }
}

/// Value after the first line starting with `marker` (case-insensitive).
pub fn marker_value<'a>(raw: &'a str, marker: &str) -> Option<&'a str> {
    raw.lines().find_map(|line| {
        let line = line.trim();
        let head = line.get(..marker.len())?;
        if head.eq_ignore_ascii_case(marker) {
            Some(line[marker.len()..].trim())
        } else {
            None
        }
    })
}

/// Map 1-5 rubric grades onto [0, 1].
pub fn normalize_grade(grade: u8) -> f64 {
    (f64::from(grade.clamp(1, 5)) - 1.0) / 4.0
}

// ── Classification ──

/// `TYPE: <label>` → [`CommitCategory`]. Defaults to Feature.
pub struct CategoryReply;

impl ReplyParser for CategoryReply {
    type Output = CommitCategory;

    fn name(&self) -> &'static str {
        "classify"
    }

    fn parse(&self, raw: &str) -> Option<CommitCategory> {
        let value = marker_value(raw, "TYPE:")?;
        if let Ok(category) = value.parse::<CommitCategory>() {
            return Some(category);
        }
        let value = value.to_lowercase();
        if value.contains("do_not_use") || value.contains("do not use") {
            Some(CommitCategory::DoNotUse)
        } else if value.contains("feature") {
            Some(CommitCategory::Feature)
        } else if value.contains("bug") || value.contains("fix") {
            Some(CommitCategory::BugFix)
        } else if value.contains("refactor") {
            Some(CommitCategory::Refactor)
        } else {
            None
        }
    }

    fn fallback(&self) -> CommitCategory {
        CommitCategory::Feature
    }
}

// ── Task prompt + difficulty ──

/// Prompt used when the oracle was unreachable.
pub const UNAVAILABLE_TASK_PROMPT: &str = "Implement a change that is nice to have for this repo.";
/// Prompt used when the oracle replied with nothing usable.
pub const EMPTY_TASK_PROMPT: &str = "Implement the change suggested by the commit.";

/// `PROMPT: ...` / `DIFFICULTY: Easy|Medium|Hard`.
pub struct TaskPromptReply;

impl TaskPromptReply {
    fn difficulty(raw: &str) -> Difficulty {
        marker_value(raw, "DIFFICULTY:")
            .and_then(|d| d.parse().ok())
            .unwrap_or_default()
    }
}

impl ReplyParser for TaskPromptReply {
    type Output = (String, Difficulty);

    fn name(&self) -> &'static str {
        "task_gen"
    }

    fn parse(&self, raw: &str) -> Option<(String, Difficulty)> {
        let prompt = marker_value(raw, "PROMPT:").filter(|p| !p.is_empty())?;
        Some((prompt.to_string(), Self::difficulty(raw)))
    }

    fn fallback(&self) -> (String, Difficulty) {
        (UNAVAILABLE_TASK_PROMPT.to_string(), Difficulty::Medium)
    }

    /// Keep the raw text as the prompt; it is still the oracle's best guess.
    fn recover(&self, raw: &str) -> (String, Difficulty) {
        let text = raw.trim();
        let prompt = if text.is_empty() { EMPTY_TASK_PROMPT } else { text };
        (prompt.to_string(), Self::difficulty(raw))
    }
}

// ── Rubric scores ──

static GRADE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)GRADE:\s*([1-5])").unwrap());
static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SCORE:\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Neutral prior for a score the oracle could not provide.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// `GRADE: <1-5>` → [0, 1].
pub struct GradeReply;

impl ReplyParser for GradeReply {
    type Output = f64;

    fn name(&self) -> &'static str {
        "grade"
    }

    fn parse(&self, raw: &str) -> Option<f64> {
        let caps = GRADE.captures(raw)?;
        let grade: u8 = caps[1].parse().ok()?;
        Some(normalize_grade(grade))
    }

    fn fallback(&self) -> f64 {
        NEUTRAL_SCORE
    }
}

/// `SCORE: <n>` where n is a 1-5 grade or already a 0-1 fraction.
pub struct SoundnessReply;

impl ReplyParser for SoundnessReply {
    type Output = f64;

    fn name(&self) -> &'static str {
        "logical_soundness"
    }

    fn parse(&self, raw: &str) -> Option<f64> {
        let caps = SCORE.captures(raw)?;
        let value: f64 = caps[1].parse().ok()?;
        if (1.0..=5.0).contains(&value) {
            Some((value - 1.0) / 4.0)
        } else {
            Some(value.clamp(0.0, 1.0))
        }
    }

    fn fallback(&self) -> f64 {
        NEUTRAL_SCORE
    }
}

/// Prose-quality sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleScores {
    pub conciseness: f64,
    pub precision: f64,
    pub tone: f64,
    pub formatting: f64,
}

impl Default for StyleScores {
    fn default() -> Self {
        Self {
            conciseness: NEUTRAL_SCORE,
            precision: NEUTRAL_SCORE,
            tone: NEUTRAL_SCORE,
            formatting: NEUTRAL_SCORE,
        }
    }
}

static STYLE_MARKERS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    ["CONCISENESS", "PRECISION", "TONE", "FORMATTING"]
        .map(|name| Regex::new(&format!(r"(?i){name}\s*:\s*([1-5])")).unwrap())
});

/// `CONCISENESS: n`, `PRECISION: n`, `TONE: n`, `FORMATTING: n`, each
/// parsed on its own; a missing one stays neutral.
pub struct StyleReply;

impl ReplyParser for StyleReply {
    type Output = StyleScores;

    fn name(&self) -> &'static str {
        "judge_style"
    }

    fn parse(&self, raw: &str) -> Option<StyleScores> {
        let [c, p, t, f] = STYLE_MARKERS.each_ref().map(|re| {
            re.captures(raw)
                .and_then(|caps| caps[1].parse::<u8>().ok())
                .map(normalize_grade)
        });
        if c.is_none() && p.is_none() && t.is_none() && f.is_none() {
            return None;
        }
        Some(StyleScores {
            conciseness: c.unwrap_or(NEUTRAL_SCORE),
            precision: p.unwrap_or(NEUTRAL_SCORE),
            tone: t.unwrap_or(NEUTRAL_SCORE),
            formatting: f.unwrap_or(NEUTRAL_SCORE),
        })
    }

    fn fallback(&self) -> StyleScores {
        StyleScores::default()
    }
}

// ── Claim verification ──

static VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(VERIFIED|CONTRADICTED|UNKNOWN)\b").unwrap());

/// First whole-word verdict token in the reply.
pub struct VerdictReply;

impl ReplyParser for VerdictReply {
    type Output = Verdict;

    fn name(&self) -> &'static str {
        "verify_claim"
    }

    fn parse(&self, raw: &str) -> Option<Verdict> {
        let upper = raw.to_uppercase();
        let caps = VERDICT.captures(&upper)?;
        match &caps[1] {
            "VERIFIED" => Some(Verdict::Verified),
            "CONTRADICTED" => Some(Verdict::Contradicted),
            _ => Some(Verdict::Unknown),
        }
    }

    fn fallback(&self) -> Verdict {
        Verdict::Unknown
    }
}

// ── Claim extraction ──

static STEPS_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{[\s\S]*"steps"[\s\S]*\}"#).unwrap());

#[derive(Deserialize)]
struct StepsPayload {
    #[serde(default)]
    steps: Option<Vec<Value>>,
}

/// Judges leave out or null fields; keep whatever strings a step does carry.
fn lenient_step(step: &Value) -> Option<ClaimStep> {
    let step = step.as_object()?;
    let intent = step
        .get("intent")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let claims = step
        .get("claims")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Some(ClaimStep { intent, claims })
}

/// `{"steps": [{"intent": ..., "claims": [...]}]}` embedded anywhere in the
/// reply, fenced or not.
pub struct ClaimsReply;

impl ReplyParser for ClaimsReply {
    type Output = Vec<ClaimStep>;

    fn name(&self) -> &'static str {
        "claim_extract"
    }

    fn parse(&self, raw: &str) -> Option<Vec<ClaimStep>> {
        let payload = STEPS_PAYLOAD
            .find(raw)
            .map(|m| m.as_str())
            .unwrap_or_else(|| raw.trim());
        let payload = serde_json::from_str::<StepsPayload>(payload).ok()?;
        Some(
            payload
                .steps
                .unwrap_or_default()
                .iter()
                .filter_map(lenient_step)
                .collect(),
        )
    }

    fn fallback(&self) -> Vec<ClaimStep> {
        Vec::new()
    }
}
