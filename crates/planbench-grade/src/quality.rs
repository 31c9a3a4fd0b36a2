use planbench_core::text::clip;
use planbench_oracle::reply::{StyleReply, StyleScores};
use planbench_oracle::{ask, JudgeOracle, Prompt, Templates};

const STYLE_MAX_TOKENS: u32 = 256;
const PLAN_CHARS: usize = 8_000;

/// Rate the plan's prose on four axes in one call.
pub fn text_quality(judge: &dyn JudgeOracle, templates: &Templates, plan: &str) -> StyleScores {
    let prompt = templates.render(Prompt::JudgeStyle, &[("plan", clip(plan, PLAN_CHARS))]);
    ask(
        judge,
        Prompt::JudgeStyle.name(),
        &prompt,
        STYLE_MAX_TOKENS,
        &StyleReply,
    )
    .resolve(&StyleReply)
}
