//! Repo maps: a compressed textual summary of a codebase, produced by
//! repomix and cached in the shared data directory.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

static FILES_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<files>.*?</files>").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum RepoMapError {
    #[error("repository path does not exist: {0}")]
    MissingRepo(PathBuf),
    #[error("repomix not available: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("repomix failed: {0}")]
    Failed(String),
    #[error("repomix did not produce {0}")]
    MissingOutput(PathBuf),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait RepoMapper {
    fn map(&self, repo: &Path) -> Result<String, RepoMapError>;
}

/// Runs repomix inside `work_dir` and reads `repomix-output.xml` back.
#[derive(Debug, Clone)]
pub struct RepomixMapper {
    /// `npx` (runs `repomix@latest`) or a repomix binary path.
    pub program: String,
    /// Comma-separated ignore globs; whitespace is stripped.
    pub ignore: String,
    /// Drop the `<files>` section, keeping only structure.
    pub exclude_files: bool,
    pub work_dir: PathBuf,
}

impl RepomixMapper {
    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(planbench_store::paths::REPOMIX_OUTPUT)
    }

    /// File `map` leaves the final map in.
    pub fn cached_path(&self) -> PathBuf {
        if self.exclude_files {
            self.work_dir
                .join(planbench_store::paths::REPOMIX_OUTPUT_COMPRESSED)
        } else {
            self.output_path()
        }
    }

    pub fn command_args(&self, repo: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.program == "npx" {
            args.push("repomix@latest".to_string());
        }
        args.extend([
            "--style".to_string(),
            "xml".to_string(),
            repo.to_string_lossy().into_owned(),
            "--compress".to_string(),
        ]);
        let patterns = normalize_ignore(&self.ignore);
        if !patterns.is_empty() {
            args.push("--ignore".to_string());
            args.push(patterns);
        }
        args
    }

    /// Reuse the cached map unless `force_refresh` or it is missing.
    pub fn cached(&self, repo: &Path, force_refresh: bool) -> Result<String, RepoMapError> {
        let path = self.cached_path();
        if !force_refresh && path.exists() {
            tracing::debug!(path = %path.display(), "using cached repo map");
            return read(&path);
        }
        self.map(repo)
    }
}

impl RepoMapper for RepomixMapper {
    fn map(&self, repo: &Path) -> Result<String, RepoMapError> {
        if !repo.exists() {
            return Err(RepoMapError::MissingRepo(repo.to_path_buf()));
        }
        std::fs::create_dir_all(&self.work_dir).map_err(|source| RepoMapError::Io {
            path: self.work_dir.clone(),
            source,
        })?;

        tracing::info!(repo = %repo.display(), "building repo map with repomix");
        let output = Command::new(&self.program)
            .args(self.command_args(repo))
            .current_dir(&self.work_dir)
            .output()
            .map_err(RepoMapError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            return Err(RepoMapError::Failed(detail.trim().to_string()));
        }

        let out_path = self.output_path();
        if !out_path.exists() {
            return Err(RepoMapError::MissingOutput(out_path));
        }
        let xml = read(&out_path)?;
        if !self.exclude_files {
            return Ok(xml);
        }
        let stripped = strip_files_section(&xml);
        let compressed = self.cached_path();
        planbench_store::write_atomic(&compressed, stripped.as_bytes()).map_err(|e| {
            RepoMapError::Io {
                path: compressed.clone(),
                source: std::io::Error::other(e.to_string()),
            }
        })?;
        Ok(stripped)
    }
}

fn read(path: &Path) -> Result<String, RepoMapError> {
    std::fs::read_to_string(path).map_err(|source| RepoMapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Multi-line YAML ignore lists collapse to one comma-separated argument.
pub fn normalize_ignore(patterns: &str) -> String {
    let joined: String = patterns.split_whitespace().collect();
    joined.trim_end_matches(',').to_string()
}

pub fn strip_files_section(xml: &str) -> String {
    FILES_SECTION.replace_all(xml, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(dir: &Path, exclude_files: bool) -> RepomixMapper {
        RepomixMapper {
            program: "npx".into(),
            ignore: "node_modules/**,\n  dist/**,\n".into(),
            exclude_files,
            work_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn npx_args_include_package_and_ignore() {
        let m = mapper(Path::new("/data"), false);
        let args = m.command_args(Path::new("/data/repos/o_r"));
        assert_eq!(
            args,
            vec![
                "repomix@latest",
                "--style",
                "xml",
                "/data/repos/o_r",
                "--compress",
                "--ignore",
                "node_modules/**,dist/**"
            ]
        );
    }

    #[test]
    fn binary_args_skip_package() {
        let mut m = mapper(Path::new("/data"), false);
        m.program = "/usr/local/bin/repomix".into();
        m.ignore = String::new();
        let args = m.command_args(Path::new("/r"));
        assert_eq!(args, vec!["--style", "xml", "/r", "--compress"]);
    }

    #[test]
    fn strips_files_block() {
        let xml = "<summary>s</summary>\n<files>\n<file path=\"a\">x</file>\n</files>\n<end/>";
        assert_eq!(strip_files_section(xml), "<summary>s</summary>\n\n<end/>");
    }

    #[test]
    fn cached_reads_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let m = mapper(dir.path(), true);
        std::fs::write(m.cached_path(), "<structure/>").unwrap();
        // repo path is never touched on a cache hit
        let map = m.cached(Path::new("/nonexistent"), false).unwrap();
        assert_eq!(map, "<structure/>");
        assert!(m.cached_path().ends_with("repomix-output-compressed.xml"));
    }

    #[test]
    fn missing_repo_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = mapper(dir.path(), false);
        assert!(matches!(
            m.cached(Path::new("/nonexistent"), true),
            Err(RepoMapError::MissingRepo(_))
        ));
    }
}
