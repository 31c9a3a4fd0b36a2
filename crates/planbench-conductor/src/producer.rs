use crate::stream::StreamMonitor;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one plan-mode session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Plan(String),
    /// The session ended cleanly but no plan text could be found.
    NoPlan { detail: String },
    Crash { error: String },
    Timeout,
}

/// Produces an implementation plan for a task prompt inside a checked-out
/// repository. Implemented by [`ClaudeCodeProducer`] and [`MockProducer`].
#[async_trait::async_trait]
pub trait PlanProducer: Send + Sync {
    async fn produce(
        &self,
        prompt: &str,
        session_id: &str,
        cwd: &Path,
        transcript: Option<&Path>,
        cancel: CancellationToken,
    ) -> Result<PlanOutcome>;
}

/// Fixed namespace UUID for plan sessions.
const PLANBENCH_NS: Uuid = Uuid::from_bytes([
    0x91, 0xa4, 0xbe, 0x4c, 0x00, 0x00, 0x50, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
]);

/// Deterministic session ID per run and task.
pub fn plan_session_id(run_id: &str, task_id: &str) -> Uuid {
    Uuid::new_v5(&PLANBENCH_NS, format!("{run_id}-{task_id}").as_bytes())
}

/// Runs `claude -p <prompt> --permission-mode plan` headless.
pub struct ClaudeCodeProducer {
    pub claude_bin: PathBuf,
    pub timeout: Duration,
}

impl ClaudeCodeProducer {
    pub fn new(claude_bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            claude_bin: claude_bin.into(),
            timeout,
        }
    }

    /// Check that the Claude CLI binary is reachable.
    pub fn verify_available(&self) -> Result<()> {
        let status = std::process::Command::new(&self.claude_bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => Ok(()),
            _ => anyhow::bail!(
                "Claude CLI not found (looked for {:?}).\n\
                 Install: npm install -g @anthropic-ai/claude-code",
                self.claude_bin
            ),
        }
    }
}

#[async_trait::async_trait]
impl PlanProducer for ClaudeCodeProducer {
    async fn produce(
        &self,
        prompt: &str,
        session_id: &str,
        cwd: &Path,
        transcript: Option<&Path>,
        cancel: CancellationToken,
    ) -> Result<PlanOutcome> {
        let mut cmd = tokio::process::Command::new(&self.claude_bin);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--verbose")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--session-id")
            .arg(session_id)
            .arg("--permission-mode")
            .arg("plan")
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            // allow running from inside another agent session
            .env_remove("CLAUDE_CODE")
            .env_remove("CLAUDECODE");

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to capture stdout"))?;
        let mut monitor = StreamMonitor::new(BufReader::new(stdout)).with_tee(transcript);

        tokio::select! {
            result = monitor.run() => {
                let session = result?;
                let exit = child.wait().await?;
                if let Some(plan) = session.plan_text() {
                    return Ok(PlanOutcome::Plan(plan));
                }
                let outcome = match session.result_subtype.as_deref() {
                    Some("success") => PlanOutcome::NoPlan {
                        detail: "session succeeded without a plan".into(),
                    },
                    Some(other) => PlanOutcome::Crash {
                        error: session
                            .result_error
                            .unwrap_or_else(|| format!("session ended with {other}")),
                    },
                    None => PlanOutcome::Crash {
                        error: format!(
                            "agent exited with code {} without result",
                            exit.code().unwrap_or(-1)
                        ),
                    },
                };
                Ok(outcome)
            }
            _ = tokio::time::sleep(self.timeout) => {
                child.kill().await.ok();
                Ok(PlanOutcome::Timeout)
            }
            _ = cancel.cancelled() => {
                child.kill().await.ok();
                Ok(PlanOutcome::Crash { error: "cancelled".into() })
            }
        }
    }
}

/// Mock producer for tests. Pops queued outcomes in order; once exhausted
/// every call returns a short canned plan.
#[derive(Default)]
pub struct MockProducer {
    outcomes: std::sync::Mutex<std::collections::VecDeque<PlanOutcome>>,
    prompts: std::sync::Mutex<Vec<(String, PathBuf)>>,
}

impl MockProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: PlanOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// `(prompt, cwd)` of every call so far.
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PlanProducer for MockProducer {
    async fn produce(
        &self,
        prompt: &str,
        _session_id: &str,
        cwd: &Path,
        _transcript: Option<&Path>,
        cancel: CancellationToken,
    ) -> Result<PlanOutcome> {
        if cancel.is_cancelled() {
            return Ok(PlanOutcome::Crash {
                error: "cancelled".into(),
            });
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), cwd.to_path_buf()));
        }
        let next = self.outcomes.lock().ok().and_then(|mut q| q.pop_front());
        Ok(next.unwrap_or_else(|| PlanOutcome::Plan("(mock) 1. Do the thing".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_deterministic() {
        assert_eq!(plan_session_id("run_1", "task_001"), plan_session_id("run_1", "task_001"));
        assert_ne!(plan_session_id("run_1", "task_001"), plan_session_id("run_1", "task_002"));
        assert_eq!(plan_session_id("run_1", "task_001").get_version_num(), 5);
    }

    #[tokio::test]
    async fn mock_pops_then_defaults() {
        let producer = MockProducer::new();
        producer.push(PlanOutcome::Timeout);
        let cwd = Path::new(".");

        let first = producer
            .produce("p1", "s", cwd, None, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first, PlanOutcome::Timeout);
        let second = producer
            .produce("p2", "s", cwd, None, CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(second, PlanOutcome::Plan(_)));
        assert_eq!(producer.calls().len(), 2);
    }

    #[tokio::test]
    async fn mock_respects_cancel() {
        let producer = MockProducer::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = producer
            .produce("p", "s", Path::new("."), None, cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, PlanOutcome::Crash { .. }));
    }

    #[cfg(unix)]
    fn fake_claude(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-claude");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_plan_from_exit_plan_mode() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_claude(
            dir.path(),
            r#"echo '{"type":"assistant","message":{"content":[{"type":"tool_use","name":"ExitPlanMode","input":{"plan":"1. Edit src/a.ts"}}]}}'
echo '{"type":"result","subtype":"success","result":"ok"}'"#,
        );
        let transcript = dir.path().join("plan_raw.jsonl");
        let producer = ClaudeCodeProducer::new(bin, Duration::from_secs(10));
        let outcome = producer
            .produce("task", "sid", dir.path(), Some(&transcript), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlanOutcome::Plan("1. Edit src/a.ts".into()));
        let raw = std::fs::read_to_string(&transcript).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_claude(
            dir.path(),
            r#"echo '{"type":"result","subtype":"error_during_execution","error":"tool failed"}'"#,
        );
        let producer = ClaudeCodeProducer::new(bin, Duration::from_secs(10));
        let outcome = producer
            .produce("task", "sid", dir.path(), None, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PlanOutcome::Crash {
                error: "tool failed".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_session_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_claude(dir.path(), "exec sleep 30");
        let producer = ClaudeCodeProducer::new(bin, Duration::from_millis(200));
        let outcome = producer
            .produce("task", "sid", dir.path(), None, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlanOutcome::Timeout);
    }
}
