use planbench_core::CommitCategory;
use planbench_oracle::reply::CategoryReply;
use planbench_oracle::{ask, JudgeOracle, Prompt, Templates};

const CLASSIFY_MAX_TOKENS: u32 = 64;

/// Anything that can label a commit message.
pub trait CategorySource {
    fn category(&self, message: &str) -> CommitCategory;
}

impl<F: Fn(&str) -> CommitCategory> CategorySource for F {
    fn category(&self, message: &str) -> CommitCategory {
        self(message)
    }
}

/// Labels commits by asking the judge a closed question about the message.
/// Unreachable oracles and unrecognized labels both yield Feature.
pub struct CommitClassifier<'a> {
    judge: &'a dyn JudgeOracle,
    templates: &'a Templates,
}

impl<'a> CommitClassifier<'a> {
    pub fn new(judge: &'a dyn JudgeOracle, templates: &'a Templates) -> Self {
        Self { judge, templates }
    }
}

impl CategorySource for CommitClassifier<'_> {
    fn category(&self, message: &str) -> CommitCategory {
        let prompt = self
            .templates
            .render(Prompt::Classify, &[("commit_message", message)]);
        ask(
            self.judge,
            Prompt::Classify.name(),
            &prompt,
            CLASSIFY_MAX_TOKENS,
            &CategoryReply,
        )
        .resolve(&CategoryReply)
    }
}
