use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git not available: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {args} failed: {stderr}")]
    Failed { args: String, stderr: String },
}

/// Read access to a repository's history, plus checkout.
///
/// All text is decoded permissively: invalid UTF-8 becomes U+FFFD rather
/// than an error.
pub trait SourceControl {
    /// Last `max` merge commits on the first-parent line, newest first.
    fn merge_history(&self, max: usize) -> Result<Vec<String>, GitError>;

    /// Resolve any revision expression to a full SHA.
    fn resolve(&self, rev: &str) -> Result<String, GitError>;

    /// Full commit message, trimmed.
    fn message(&self, sha: &str) -> Result<String, GitError>;

    /// Tree diff from `a` to `b`.
    fn diff_between(&self, a: &str, b: &str) -> Result<String, GitError>;

    /// Commits reachable from `b` but not from `a`, newest first.
    fn commits_between(&self, a: &str, b: &str) -> Result<Vec<String>, GitError>;

    /// Diff a single commit introduced against its first parent.
    fn commit_diff(&self, sha: &str) -> Result<String, GitError>;

    /// Force the working tree to `rev`.
    fn checkout(&self, rev: &str) -> Result<(), GitError>;

    /// Pre-merge state: the first parent.
    fn resolve_parent(&self, sha: &str) -> Result<String, GitError> {
        self.resolve(&format!("{sha}^1"))
    }

    /// Merged branch head: the second parent.
    fn branch_tip(&self, sha: &str) -> Result<String, GitError> {
        self.resolve(&format!("{sha}^2"))
    }
}

/// Run git in `dir`, returning lossily decoded stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(GitError::Failed {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// [`SourceControl`] over the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    history_rev: String,
}

impl GitCli {
    /// History is walked from `HEAD` until [`GitCli::with_history_rev`] says otherwise.
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            history_rev: "HEAD".to_string(),
        }
    }

    /// Walk merge history from `rev` instead of `HEAD`, so a checkout left
    /// behind by plan runs does not narrow it.
    pub fn with_history_rev(mut self, rev: impl Into<String>) -> Self {
        self.history_rev = rev.into();
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        run_git(&self.repo, args)
    }
}

impl SourceControl for GitCli {
    fn merge_history(&self, max: usize) -> Result<Vec<String>, GitError> {
        let n = max.to_string();
        let out = self.git(&[
            "log",
            "-n",
            &n,
            "--merges",
            "--first-parent",
            "--format=%H",
            &self.history_rev,
            "--",
        ])?;
        Ok(lines(&out))
    }

    fn resolve(&self, rev: &str) -> Result<String, GitError> {
        let out = self.git(&["rev-parse", "--verify", "--quiet", rev])?;
        Ok(out.trim().to_string())
    }

    fn message(&self, sha: &str) -> Result<String, GitError> {
        let out = self.git(&["log", "-1", "--format=%B", sha])?;
        Ok(out.trim().to_string())
    }

    fn diff_between(&self, a: &str, b: &str) -> Result<String, GitError> {
        self.git(&["diff", "--no-color", "--no-renames", a, b, "--"])
    }

    fn commits_between(&self, a: &str, b: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{a}..{b}");
        let out = self.git(&["rev-list", &range])?;
        Ok(lines(&out))
    }

    fn commit_diff(&self, sha: &str) -> Result<String, GitError> {
        self.git(&["show", "--format=", "--no-color", "--no-renames", sha, "--"])
    }

    fn checkout(&self, rev: &str) -> Result<(), GitError> {
        self.git(&["checkout", "-q", "-f", rev])?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testrepo {
    use super::run_git;
    use std::path::Path;

    pub fn git(dir: &Path, args: &[&str]) -> String {
        run_git(dir, args).unwrap()
    }

    pub fn init(dir: &Path) {
        git(dir, &["init", "-q"]);
        git(dir, &["config", "user.email", "test@test.com"]);
        git(dir, &["config", "user.name", "Test"]);
        git(dir, &["config", "commit.gpgsign", "false"]);
    }

    pub fn commit(dir: &Path, file: &str, content: &str, message: &str) -> String {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "-q", "-m", message]);
        git(dir, &["rev-parse", "HEAD"]).trim().to_string()
    }

    /// main: init → merge(feature: two commits). Returns (base, merge).
    pub fn with_one_merge(dir: &Path) -> (String, String) {
        init(dir);
        let base = commit(dir, "README.md", "hello\n", "init");
        git(dir, &["checkout", "-q", "-b", "feature"]);
        commit(dir, "src/retry.ts", "export const MAX_RETRIES = 3;\n", "Add retry constant");
        commit(dir, "src/auth/login.ts", "retry();\n", "Use retry in login");
        git(dir, &["checkout", "-q", &base]);
        git(dir, &["checkout", "-q", "-B", "main"]);
        git(dir, &["merge", "-q", "--no-ff", "-m", "Merge branch 'feature'", "feature"]);
        let merge = git(dir, &["rev-parse", "HEAD"]).trim().to_string();
        (base, merge)
    }
}

#[cfg(test)]
mod tests {
    use super::testrepo::*;
    use super::*;

    #[test]
    fn history_lists_first_parent_merges() {
        let dir = tempfile::tempdir().unwrap();
        let (base, merge) = with_one_merge(dir.path());
        let scm = GitCli::new(dir.path());

        assert_eq!(scm.merge_history(10).unwrap(), vec![merge.clone()]);
        assert_eq!(scm.resolve_parent(&merge).unwrap(), base);
        let tip = scm.branch_tip(&merge).unwrap();
        assert_eq!(scm.commits_between(&base, &tip).unwrap().len(), 2);
    }

    #[test]
    fn root_commit_has_no_parent() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        let root = commit(dir.path(), "a.txt", "a", "root");
        let scm = GitCli::new(dir.path());
        assert!(scm.resolve_parent(&root).is_err());
    }

    #[test]
    fn diff_between_lists_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let (base, merge) = with_one_merge(dir.path());
        let scm = GitCli::new(dir.path());
        let diff = scm.diff_between(&base, &merge).unwrap();
        assert!(diff.contains("diff --git a/src/retry.ts b/src/retry.ts"));
        assert!(diff.contains("new file mode"));
    }

    #[test]
    fn checkout_moves_working_tree() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = with_one_merge(dir.path());
        let scm = GitCli::new(dir.path());
        scm.checkout(&base).unwrap();
        assert!(!dir.path().join("src/retry.ts").exists());
    }

    #[test]
    fn failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        let scm = GitCli::new(dir.path());
        match scm.message("deadbeef") {
            Err(GitError::Failed { args, .. }) => assert!(args.starts_with("log")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
