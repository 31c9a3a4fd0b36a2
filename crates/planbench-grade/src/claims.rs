use planbench_core::text::clip;
use planbench_core::{ClaimStep, Verdict};
use planbench_oracle::reply::{ClaimsReply, VerdictReply};
use planbench_oracle::{ask, JudgeOracle, Prompt, SearchOracle, Templates};

const CLAIM_EXTRACT_MAX_TOKENS: u32 = 2048;
const CLAIM_EXTRACT_PLAN_CHARS: usize = 50_000;
const VERIFY_MAX_TOKENS: u32 = 32;
const QUERY_MAX_CHARS: usize = 80;

/// Split a plan into ordered steps with their atomic claims. Any oracle
/// failure yields no steps.
pub fn extract_claims(judge: &dyn JudgeOracle, templates: &Templates, plan: &str) -> Vec<ClaimStep> {
    let prompt = templates.render(
        Prompt::ClaimExtract,
        &[("plan", clip(plan, CLAIM_EXTRACT_PLAN_CHARS))],
    );
    let steps = ask(
        judge,
        Prompt::ClaimExtract.name(),
        &prompt,
        CLAIM_EXTRACT_MAX_TOKENS,
        &ClaimsReply,
    )
    .resolve(&ClaimsReply);
    tracing::debug!(
        steps = steps.len(),
        claims = steps.iter().map(|s| s.claims.len()).sum::<usize>(),
        "extracted claims"
    );
    steps
}

/// Verdicts for the checked claims plus the two ratios the rubric reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimCheck {
    pub verdicts: Vec<Verdict>,
    /// `1 - contradicted / n`, 0 when nothing was checked.
    pub verified_and_unknown_ratio: f64,
    /// `unknown / n`, 0 when nothing was checked.
    pub unknown_ratio: f64,
}

/// Checks plan claims against web search, with the judge comparing each claim
/// to the returned snippets.
pub struct ClaimVerifier<'a> {
    pub judge: &'a dyn JudgeOracle,
    pub search: Option<&'a dyn SearchOracle>,
    pub templates: &'a Templates,
    pub max_claims: usize,
    pub top_n: usize,
}

impl ClaimVerifier<'_> {
    /// Verify up to `max_claims` non-blank claims, in step order.
    pub fn verify(&self, steps: &[ClaimStep]) -> ClaimCheck {
        let verdicts: Vec<Verdict> = steps
            .iter()
            .flat_map(|step| step.claims.iter())
            .filter(|claim| !claim.trim().is_empty())
            .take(self.max_claims)
            .map(|claim| self.verify_one(claim))
            .collect();
        let (verified_and_unknown_ratio, unknown_ratio) = claim_ratios(&verdicts);
        ClaimCheck {
            verdicts,
            verified_and_unknown_ratio,
            unknown_ratio,
        }
    }

    fn verify_one(&self, claim: &str) -> Verdict {
        let Some(search) = self.search else {
            return Verdict::Unknown;
        };
        let query = search_query(claim);
        let snippets = match search.search(&query, self.top_n) {
            Ok(snippets) => snippets,
            Err(e) => {
                tracing::warn!(%query, error = %e, "search failed, claim unknown");
                return Verdict::Unknown;
            }
        };
        if snippets.is_empty() {
            return Verdict::Unknown;
        }

        let snippet = snippets.join("\n");
        let prompt = self.templates.render(
            Prompt::VerifyClaim,
            &[("claim", claim), ("snippet", snippet.as_str())],
        );
        ask(
            self.judge,
            Prompt::VerifyClaim.name(),
            &prompt,
            VERIFY_MAX_TOKENS,
            &VerdictReply,
        )
        .resolve(&VerdictReply)
    }
}

/// Claim text with double quotes removed, cut to a short query.
pub fn search_query(claim: &str) -> String {
    let unquoted = claim.replace('"', "");
    clip(unquoted.trim(), QUERY_MAX_CHARS).to_string()
}

/// `(1 - contradicted / n, unknown / n)`; both 0 for no verdicts.
pub fn claim_ratios(verdicts: &[Verdict]) -> (f64, f64) {
    if verdicts.is_empty() {
        return (0.0, 0.0);
    }
    let n = verdicts.len() as f64;
    let count = |v: Verdict| verdicts.iter().filter(|x| **x == v).count() as f64;
    (
        1.0 - count(Verdict::Contradicted) / n,
        count(Verdict::Unknown) / n,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use planbench_oracle::{ScriptedJudge, ScriptedSearch};

    fn steps(claims: &[&[&str]]) -> Vec<ClaimStep> {
        claims
            .iter()
            .enumerate()
            .map(|(i, cs)| ClaimStep {
                intent: format!("step {i}"),
                claims: cs.iter().map(|c| c.to_string()).collect(),
            })
            .collect()
    }

    #[test]
    fn ratios_for_mixed_verdicts() {
        let verdicts = [
            Verdict::Verified,
            Verdict::Verified,
            Verdict::Contradicted,
            Verdict::Unknown,
        ];
        assert_eq!(claim_ratios(&verdicts), (0.75, 0.25));
        assert_eq!(claim_ratios(&[]), (0.0, 0.0));
    }

    #[test]
    fn extracts_fenced_steps() {
        let judge = ScriptedJudge::new().reply(
            "Here:\n```json\n{\"steps\": [{\"intent\": \"add retry\", \"claims\": [\"ky supports retry\"]}]}\n```",
        );
        let templates = Templates::builtin();
        let steps = extract_claims(&judge, &templates, "1. Add retry");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].intent, "add retry");
        assert_eq!(steps[0].claims, vec!["ky supports retry"]);
    }

    #[test]
    fn extraction_failure_is_empty() {
        let templates = Templates::builtin();
        let judge = ScriptedJudge::new().reply("I could not parse that plan.");
        assert!(extract_claims(&judge, &templates, "plan").is_empty());
        let judge = ScriptedJudge::new().fail_next("timeout");
        assert!(extract_claims(&judge, &templates, "plan").is_empty());
    }

    #[test]
    fn verifies_at_most_max_claims_in_order() {
        let judge = ScriptedJudge::new()
            .reply("VERIFIED")
            .reply("CONTRADICTED.")
            .reply("verified");
        let search = ScriptedSearch::with_results(["snippet a", "snippet b"]);
        let templates = Templates::builtin();
        let verifier = ClaimVerifier {
            judge: &judge,
            search: Some(&search),
            templates: &templates,
            max_claims: 2,
            top_n: 5,
        };

        let check = verifier.verify(&steps(&[&["first", "  "], &["second", "third"]]));
        assert_eq!(check.verdicts, vec![Verdict::Verified, Verdict::Contradicted]);
        assert_eq!(search.queries(), vec!["first", "second"]);
        assert_eq!(check.verified_and_unknown_ratio, 0.5);
        assert_eq!(check.unknown_ratio, 0.0);

        let calls = judge.calls();
        let (_, prompt) = &calls[0];
        assert!(prompt.contains("snippet a\nsnippet b"));
    }

    #[test]
    fn no_search_backend_means_unknown() {
        let judge = ScriptedJudge::new();
        let templates = Templates::builtin();
        let verifier = ClaimVerifier {
            judge: &judge,
            search: None,
            templates: &templates,
            max_claims: 3,
            top_n: 5,
        };
        let check = verifier.verify(&steps(&[&["a", "b"]]));
        assert_eq!(check.verdicts, vec![Verdict::Unknown, Verdict::Unknown]);
        assert_eq!(check.unknown_ratio, 1.0);
        assert_eq!(check.verified_and_unknown_ratio, 1.0);
        assert!(judge.calls().is_empty());
    }

    #[test]
    fn empty_or_failed_search_skips_judge() {
        let judge = ScriptedJudge::new();
        let templates = Templates::builtin();
        for search in [ScriptedSearch::empty(), ScriptedSearch::failing()] {
            let verifier = ClaimVerifier {
                judge: &judge,
                search: Some(&search),
                templates: &templates,
                max_claims: 3,
                top_n: 5,
            };
            let check = verifier.verify(&steps(&[&["claim"]]));
            assert_eq!(check.verdicts, vec![Verdict::Unknown]);
        }
        assert!(judge.calls().is_empty());
    }

    #[test]
    fn query_strips_quotes_and_caps_length() {
        assert_eq!(search_query(r#"uses "ky" retry"#), "uses ky retry");
        let long = "x".repeat(200);
        assert_eq!(search_query(&long).len(), 80);
    }
}
