use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Every oracle prompt the pipeline sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    Classify,
    TaskGen,
    ClaimExtract,
    VerifyClaim,
    LogicalSoundness,
    JudgeGtMatch,
    JudgeStyle,
}

impl Prompt {
    pub const ALL: [Prompt; 7] = [
        Prompt::Classify,
        Prompt::TaskGen,
        Prompt::ClaimExtract,
        Prompt::VerifyClaim,
        Prompt::LogicalSoundness,
        Prompt::JudgeGtMatch,
        Prompt::JudgeStyle,
    ];

    /// Stem of the override file and the call-log label.
    pub fn name(&self) -> &'static str {
        match self {
            Prompt::Classify => "classify",
            Prompt::TaskGen => "task_gen",
            Prompt::ClaimExtract => "claim_extract",
            Prompt::VerifyClaim => "verify_claim",
            Prompt::LogicalSoundness => "logical_soundness",
            Prompt::JudgeGtMatch => "judge_gt_match",
            Prompt::JudgeStyle => "judge_style",
        }
    }

    pub fn builtin(&self) -> &'static str {
        match self {
            Prompt::Classify => CLASSIFY,
            Prompt::TaskGen => TASK_GEN,
            Prompt::ClaimExtract => CLAIM_EXTRACT,
            Prompt::VerifyClaim => VERIFY_CLAIM,
            Prompt::LogicalSoundness => LOGICAL_SOUNDNESS,
            Prompt::JudgeGtMatch => JUDGE_GT_MATCH,
            Prompt::JudgeStyle => JUDGE_STYLE,
        }
    }
}

/// Prompt templates: built-ins, optionally overridden by
/// `<prompts_dir>/<name>.txt`. Overrides are read once at construction.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    overrides: HashMap<Prompt, String>,
}

impl Templates {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load overrides from `dir`. A missing dir or unreadable file keeps the built-in.
    pub fn load(dir: &Path) -> Self {
        let mut overrides = HashMap::new();
        for prompt in Prompt::ALL {
            let path: PathBuf = dir.join(format!("{}.txt", prompt.name()));
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::debug!(path = %path.display(), "using prompt override");
                    overrides.insert(prompt, text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable prompt override, using built-in");
                }
            }
        }
        Self { overrides }
    }

    pub fn get(&self, prompt: Prompt) -> &str {
        self.overrides
            .get(&prompt)
            .map(String::as_str)
            .unwrap_or_else(|| prompt.builtin())
    }

    /// Fill `{{name}}` placeholders for `prompt`.
    pub fn render(&self, prompt: Prompt, vars: &[(&str, &str)]) -> String {
        render(self.get(prompt), vars)
    }
}

/// Substitute `{{name}}` placeholders in one pass. Unknown placeholders are
/// left as-is, and placeholder-shaped text inside substituted values is not
/// expanded again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

const CLASSIFY: &str = "Classify this git merge commit into exactly one category based on its message.

Categories:
- feature_request: New functionality, new feature, enhancement, or new capability.
- bug_fix: Fixing a bug, correcting incorrect behavior, or fixing a regression.
- code_refactoring: Restructuring code without changing behavior (renames, extracting functions, style cleanup, no new features or bug fixes).
- do_not_use: The change is too small to need a plan: trivial tweaks, config-only updates, dependency bumps, and similar.

Reply with exactly one line:
TYPE: <feature_request | bug_fix | code_refactoring | do_not_use>

Commit message:
{{commit_message}}
";

const TASK_GEN: &str = "Reverse-engineer this git diff. Write the request a user would have made to trigger this change. Do not mention or hint at the solution.
Output exactly two lines:
PROMPT: <user prompt>
DIFFICULTY: <Easy | Medium | Hard>

Repo Map (context):
{{repo_map}}

Commit message:
{{commit_message}}

Diff:
{{diff}}
";

const CLAIM_EXTRACT: &str = r#"Split the plan below into its ordered steps. For each step give a short intent and the atomic, independently checkable factual claims it makes (APIs, library behavior, file contents). Output JSON only:
{"steps": [{"intent": "...", "claims": ["..."]}]}

Plan:
{{plan}}
"#;

const VERIFY_CLAIM: &str = r#"Claim from plan: "{{claim}}"
Search result snippet: "{{snippet}}"

Does the snippet support the claim or contradict it? Reply with exactly one word: VERIFIED, CONTRADICTED, or UNKNOWN (if unclear)."#;

const LOGICAL_SOUNDNESS: &str = "Repo context (excerpt): {{repo_map}}

Plan steps:
{{steps}}

Full plan (excerpt): {{plan}}

Evaluate: (1) Does any step require an output that a previous step fails to produce? (2) Is the overall plan logically sound and does it solve the problem?
Reply with SCORE: <1-5> (1=very unsound, 5=very sound) then one sentence.";

const JUDGE_GT_MATCH: &str = "You are grading an AI-written implementation plan against the change that was actually made.

User task:
{{task_prompt}}

What the real change did:
- Files modified: {{files_modified}}
- Files created: {{files_created}}
- Libraries added: {{libraries_added}}
- Key additions: {{key_additions}}

Real commit message:
{{commit_message}}

Real diff (excerpt):
{{diff_summary}}

AI plan:
{{plan}}

Does the plan achieve the same underlying goal as the real change? Differences in approach are fine if the outcome is equivalent.
Reply with GRADE: <1-5> (1=unrelated, 5=same goal and scope) then one sentence.";

const JUDGE_STYLE: &str = "Rate the writing of this implementation plan on four axes, 1-5 each (5 is best):
- CONCISENESS: no filler or repetition.
- PRECISION: concrete files, functions and steps instead of vague intentions.
- TONE: direct and professional.
- FORMATTING: clear structure, readable lists and code references.

Reply with exactly four lines:
CONCISENESS: <1-5>
PRECISION: <1-5>
TONE: <1-5>
FORMATTING: <1-5>

Plan:
{{plan}}
";
