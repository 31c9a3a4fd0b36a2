use planbench_core::text::clip;
use planbench_core::ClaimStep;
use planbench_oracle::reply::SoundnessReply;
use planbench_oracle::{ask, JudgeOracle, Prompt, Templates};

const SOUNDNESS_MAX_TOKENS: u32 = 256;
const REPO_MAP_CHARS: usize = 8_000;
const PLAN_CHARS: usize = 6_000;

/// Ask the reviewer whether each step's inputs are produced by earlier steps
/// and whether the plan holds together. Returns [0, 1], 0.5 on failure.
pub fn logical_soundness(
    reviewer: &dyn JudgeOracle,
    templates: &Templates,
    plan: &str,
    steps: &[ClaimStep],
    repo_map: &str,
) -> f64 {
    let summary = step_summary(steps);
    let prompt = templates.render(
        Prompt::LogicalSoundness,
        &[
            ("repo_map", clip(repo_map, REPO_MAP_CHARS)),
            ("steps", summary.as_str()),
            ("plan", clip(plan, PLAN_CHARS)),
        ],
    );
    ask(
        reviewer,
        Prompt::LogicalSoundness.name(),
        &prompt,
        SOUNDNESS_MAX_TOKENS,
        &SoundnessReply,
    )
    .resolve(&SoundnessReply)
}

/// `Step 1: <intent>` per line.
fn step_summary(steps: &[ClaimStep]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Step {}: {}", i + 1, s.intent))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use planbench_oracle::ScriptedJudge;

    fn step(intent: &str) -> ClaimStep {
        ClaimStep {
            intent: intent.into(),
            claims: Vec::new(),
        }
    }

    #[test]
    fn normalizes_five_point_score() {
        let judge = ScriptedJudge::new().reply("SCORE: 4\nSteps build on each other.");
        let templates = Templates::builtin();
        let score = logical_soundness(&judge, &templates, "plan", &[step("a")], "");
        assert_eq!(score, 0.75);
    }

    #[test]
    fn prompt_lists_steps_in_order() {
        let judge = ScriptedJudge::new().reply("SCORE: 5");
        let templates = Templates::builtin();
        logical_soundness(
            &judge,
            &templates,
            "plan",
            &[step("add constant"), step("use constant")],
            "<map/>",
        );
        let calls = judge.calls();
        let (label, prompt) = &calls[0];
        assert_eq!(label, "logical_soundness");
        assert!(prompt.contains("Step 1: add constant\nStep 2: use constant"));
        assert!(prompt.contains("<map/>"));
    }

    #[test]
    fn neutral_on_failure() {
        let templates = Templates::builtin();
        let judge = ScriptedJudge::new().reply("looks fine to me");
        assert_eq!(logical_soundness(&judge, &templates, "p", &[], ""), 0.5);
        let judge = ScriptedJudge::new().fail_next("overloaded");
        assert_eq!(logical_soundness(&judge, &templates, "p", &[], ""), 0.5);
    }
}
