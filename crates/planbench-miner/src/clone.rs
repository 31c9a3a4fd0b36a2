use crate::git::{run_git, GitError, SourceControl};
use std::path::Path;

/// Directory name for a repository URL: `https://github.com/owner/repo(.git)`
/// and `git@github.com:owner/repo.git` both become `owner_repo`.
pub fn repo_slug(repo_url: &str) -> String {
    let url = repo_url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let parts: Vec<&str> = url
        .split(['/', ':'])
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [.., owner, repo] => format!("{owner}_{repo}"),
        [only] => only
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect(),
        [] => "repo".to_string(),
    }
}

/// Remote-tracking ref for `branch`, or the remote's default branch.
pub fn upstream_ref(branch: Option<&str>) -> String {
    match branch.filter(|b| !b.is_empty()) {
        Some(branch) => format!("origin/{branch}"),
        None => "origin/HEAD".to_string(),
    }
}

/// Revision merge history should be walked from: the upstream branch when
/// the clone has it, `HEAD` otherwise.
pub fn history_rev(scm: &dyn SourceControl, branch: Option<&str>) -> String {
    let upstream = upstream_ref(branch);
    match scm.resolve(&upstream) {
        Ok(_) => upstream,
        Err(e) => {
            tracing::warn!(rev = %upstream, error = %e, "no upstream ref, mining from HEAD");
            "HEAD".to_string()
        }
    }
}

/// Full clone of `repo_url` into `dest`. If `dest` already exists, fetch and
/// move the working tree to the fetched branch tip instead. A failed fetch
/// only warns, since the existing clone is usable.
pub fn clone_or_fetch(repo_url: &str, branch: Option<&str>, dest: &Path) -> Result<(), GitError> {
    if dest.exists() {
        tracing::info!(path = %dest.display(), "repository present, fetching");
        if let Err(e) = run_git(dest, &["fetch", "-q", "origin"]) {
            tracing::warn!(error = %e, "fetch failed, using existing clone");
            return Ok(());
        }
        let upstream = upstream_ref(branch);
        if let Err(e) = run_git(dest, &["checkout", "-q", "-f", &upstream]) {
            tracing::warn!(rev = %upstream, error = %e, "cannot check out fetched branch");
        }
        return Ok(());
    }

    let parent = dest.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let dest_str = dest.to_string_lossy();
    let mut args = vec!["clone", "-q"];
    if let Some(branch) = branch.filter(|b| !b.is_empty()) {
        args.extend(["--branch", branch]);
    }
    args.extend([repo_url, dest_str.as_ref()]);

    tracing::info!(url = repo_url, path = %dest.display(), "cloning repository");
    run_git(parent, &args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testrepo::{commit, git, with_one_merge};
    use crate::git::GitCli;
    use crate::mine::{mine, MineOptions};

    #[test]
    fn slug_from_https_and_ssh() {
        assert_eq!(repo_slug("https://github.com/vercel/next.js"), "vercel_next.js");
        assert_eq!(repo_slug("https://github.com/owner/repo.git/"), "owner_repo");
        assert_eq!(repo_slug("git@github.com:owner/repo.git"), "owner_repo");
    }

    #[test]
    fn slug_single_component() {
        assert_eq!(repo_slug("my repo"), "my_repo");
        assert_eq!(repo_slug(""), "repo");
    }

    #[test]
    fn clone_then_fetch() {
        let src = tempfile::tempdir().unwrap();
        let (_, merge) = with_one_merge(src.path());
        let data = tempfile::tempdir().unwrap();
        let dest = data.path().join("repos").join("local_src");
        let url = src.path().to_string_lossy().to_string();

        clone_or_fetch(&url, Some("main"), &dest).unwrap();
        let head = run_git(&dest, &["rev-parse", "HEAD"]).unwrap();
        assert_eq!(head.trim(), merge);

        // second call takes the fetch path
        clone_or_fetch(&url, Some("main"), &dest).unwrap();
    }

    #[test]
    fn mining_ignores_leftover_checkout_and_sees_new_merges() {
        let src = tempfile::tempdir().unwrap();
        let (base, merge) = with_one_merge(src.path());
        let data = tempfile::tempdir().unwrap();
        let dest = data.path().join("repos").join("local_src");
        let url = src.path().to_string_lossy().to_string();
        clone_or_fetch(&url, Some("main"), &dest).unwrap();

        // a plan run leaves the clone detached at an old commit
        let scm = GitCli::new(&dest);
        scm.checkout(&base).unwrap();
        assert!(scm.merge_history(10).unwrap().is_empty());

        let opts = MineOptions {
            max_commits: 10,
            diff_max_bytes: 100_000,
        };
        let rev = history_rev(&scm, Some("main"));
        assert_eq!(rev, "origin/main");
        let mined = mine(&scm.with_history_rev(rev), opts).unwrap();
        assert_eq!(mined.len(), 1);
        assert_eq!(mined[0].merge_sha, merge);

        // upstream gains a second merge; contextize fetches it
        git(src.path(), &["checkout", "-q", "-b", "feature2"]);
        commit(src.path(), "src/cache.ts", "export const TTL = 60;\n", "Add cache ttl");
        git(src.path(), &["checkout", "-q", "main"]);
        git(src.path(), &["merge", "-q", "--no-ff", "-m", "Merge branch 'feature2'", "feature2"]);
        clone_or_fetch(&url, Some("main"), &dest).unwrap();

        let scm = GitCli::new(&dest);
        let rev = history_rev(&scm, Some("main"));
        let mined = mine(&scm.with_history_rev(rev), opts).unwrap();
        assert_eq!(mined.len(), 2);
        assert!(dest.join("src/cache.ts").exists());
    }

    #[test]
    fn history_rev_falls_back_to_head() {
        let dir = tempfile::tempdir().unwrap();
        with_one_merge(dir.path());
        assert_eq!(history_rev(&GitCli::new(dir.path()), Some("main")), "HEAD");
    }

    #[test]
    fn clone_failure_is_error() {
        let data = tempfile::tempdir().unwrap();
        let dest = data.path().join("repos").join("missing");
        let err = clone_or_fetch("/nonexistent/repo", None, &dest).unwrap_err();
        assert!(matches!(err, GitError::Failed { .. }));
    }
}
