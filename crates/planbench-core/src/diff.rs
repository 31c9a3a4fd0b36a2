//! Unified-diff analysis: which files a change touched, which dependencies it
//! added, and the size/encoding guards applied before a diff is stored or sent
//! to an oracle.

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Appended to a diff cut by [`truncate`].
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Pre-image path git uses for a file that did not exist.
pub const NULL_DEVICE: &str = "/dev/null";

/// JSON manifests whose added `"key": value` lines name dependencies.
pub const JSON_MANIFESTS: &[&str] = &["package.json", "composer.json", "bower.json"];

/// Plain dependency lists, one requirement per line.
pub const DEPENDENCY_LIST_GLOBS: &[&str] = &["requirements*.txt", "constraints*.txt"];

/// Manifest keys that describe the manifest itself rather than a dependency.
pub const MANIFEST_STRUCTURAL_KEYS: &[&str] = &[
    "name",
    "version",
    "description",
    "scripts",
    "main",
    "module",
    "types",
    "type",
    "private",
    "license",
    "author",
    "contributors",
    "repository",
    "homepage",
    "bugs",
    "keywords",
    "engines",
    "files",
    "exports",
    "workspaces",
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
    "require",
    "require-dev",
];

/// Opens every per-file section, whatever form its paths take.
const DIFF_HEADER_PREFIX: &str = "diff --git ";

/// Unquoted `a/<x> b/<y>` path pair after [`DIFF_HEADER_PREFIX`].
static HEADER_PATHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^a/(.+?) b/(.+)$").unwrap());

static MANIFEST_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^["']([^"']+)["']\s*:"#).unwrap());

static REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)(?:\[[^\]]*\])?\s*(?:(?:===|==|>=|<=|~=|!=|<|>)\s*\S+)?$")
        .unwrap()
});

static DEPENDENCY_LISTS: LazyLock<GlobSet> = LazyLock::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEPENDENCY_LIST_GLOBS {
        builder.add(Glob::new(pattern).unwrap());
    }
    builder.build().unwrap()
});

/// One per-file section of a git diff.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlock<'a> {
    /// Post-image path (pre-image path for deletions).
    pub path: String,
    pub created: bool,
    pub deleted: bool,
    /// Lines inside hunks, prefixes intact.
    pub hunk_lines: Vec<&'a str>,
}

impl<'a> FileBlock<'a> {
    fn new(path: String) -> Self {
        Self {
            path,
            created: false,
            deleted: false,
            hunk_lines: Vec::new(),
        }
    }

    /// Added lines with the leading `+` removed.
    pub fn added_lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.hunk_lines
            .iter()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++ "))
            .map(|l| &l[1..])
    }

    fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Split a diff into per-file blocks delimited by `diff --git` headers.
pub fn split_blocks(diff: &str) -> Vec<FileBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<FileBlock<'_>> = None;
    let mut in_hunk = false;

    for line in diff.lines() {
        if let Some(paths) = line.strip_prefix(DIFF_HEADER_PREFIX) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(FileBlock::new(header_path(paths)));
            in_hunk = false;
            continue;
        }
        let Some(block) = current.as_mut() else {
            continue;
        };

        if in_hunk {
            block.hunk_lines.push(line);
            continue;
        }
        if line.starts_with("@@") {
            in_hunk = true;
        } else if line.starts_with("new file mode") || line == "new file" {
            block.created = true;
        } else if line.starts_with("deleted file mode") {
            block.deleted = true;
        } else if let Some(old) = line.strip_prefix("--- ") {
            if old.trim_end() == NULL_DEVICE {
                block.created = true;
            }
        } else if let Some(new) = line.strip_prefix("+++ ") {
            let new = unquote(new.trim_end());
            if new == NULL_DEVICE {
                block.deleted = true;
            } else {
                block.path = new.strip_prefix("b/").unwrap_or(&new).to_string();
            }
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

/// Post-image path from the text after `diff --git `. Git wraps paths with
/// special or non-ASCII characters in C-style quotes.
fn header_path(paths: &str) -> String {
    let paths = paths.trim_end();
    if paths.ends_with('"') {
        if let Some(start) = paths.rfind(" \"b/").or_else(|| paths.rfind(" \"")) {
            let post = unquote(&paths[start + 1..]);
            return post.strip_prefix("b/").unwrap_or(&post).to_string();
        }
    }
    if let Some(caps) = HEADER_PATHS.captures(paths) {
        return caps[2].to_string();
    }
    // `"a/<x>" b/<y>`: only the pre-image was quoted
    if let Some(start) = paths.rfind(" b/") {
        return paths[start + 3..].to_string();
    }
    unquote(paths)
}

/// Decode a git C-quoted path (`"caf\303\251.json"`). Unquoted input is
/// returned as-is.
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(d @ '0'..='7') => {
                let mut value = d as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&o @ '0'..='7') => {
                            value = value * 8 + (o as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Files a diff touches, as `(modified, created)`. Disjoint: created wins.
pub fn parse_files(diff: &str) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut modified = BTreeSet::new();
    let mut created = BTreeSet::new();

    for block in split_blocks(diff) {
        if block.created {
            created.insert(block.path);
        } else {
            modified.insert(block.path);
        }
    }
    modified.retain(|p| !created.contains(p));
    (modified, created)
}

/// Dependency names added by a diff, from JSON manifests and requirement lists.
pub fn parse_added_dependencies(diff: &str) -> BTreeSet<String> {
    let mut added = BTreeSet::new();

    for block in split_blocks(diff) {
        let file_name = block.file_name();
        if JSON_MANIFESTS.contains(&file_name) {
            for line in block.added_lines() {
                if let Some(dep) = manifest_dependency(line) {
                    added.insert(dep);
                }
            }
        } else if DEPENDENCY_LISTS.is_match(file_name) {
            for line in block.added_lines() {
                if let Some(dep) = requirement_name(line) {
                    added.insert(dep);
                }
            }
        }
    }
    added
}

fn manifest_dependency(line: &str) -> Option<String> {
    let stripped = line.trim();
    if stripped.starts_with("//") {
        return None;
    }
    let caps = MANIFEST_KEY.captures(stripped)?;
    let key = &caps[1];
    if MANIFEST_STRUCTURAL_KEYS.contains(&key) {
        return None;
    }
    Some(key.to_string())
}

fn requirement_name(line: &str) -> Option<String> {
    let stripped = line.split('#').next().unwrap_or("");
    let stripped = stripped.split(';').next().unwrap_or("").trim();
    if stripped.is_empty() || stripped.starts_with('-') {
        return None;
    }
    REQUIREMENT
        .captures(stripped)
        .map(|caps| caps[1].to_string())
}

/// Cap a diff at `max_bytes`, cutting on a char boundary and appending
/// [`TRUNCATION_MARKER`].
pub fn truncate(diff: &str, max_bytes: usize) -> String {
    if diff.len() <= max_bytes {
        return diff.to_string();
    }
    let mut end = max_bytes;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_MARKER}", &diff[..end])
}

/// Drop every line carrying U+FFFD, the residue of binary or mis-decoded bytes.
pub fn sanitize(diff: &str) -> String {
    if !diff.contains('\u{FFFD}') {
        return diff.to_string();
    }
    let mut out: String = diff
        .lines()
        .filter(|l| !l.contains('\u{FFFD}'))
        .collect::<Vec<_>>()
        .join("\n");
    if diff.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Sanitize then truncate: the guard every stored diff passes through.
pub fn prepare(diff: &str, max_bytes: usize) -> String {
    truncate(&sanitize(diff), max_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODIFIED: &str = "diff --git a/src/auth/login.ts b/src/auth/login.ts
index abc..def 100644
--- a/src/auth/login.ts
+++ b/src/auth/login.ts
@@ -1,3 +1,4 @@
+const MAX_RETRIES = 3;
";

    const CREATED: &str = "diff --git a/src/new.ts b/src/new.ts
new file mode 100644
index 0000000..abc
--- /dev/null
+++ b/src/new.ts
@@ -0,0 +1,2 @@
+export const x = 1;
";

    #[test]
    fn modified_file_is_not_created() {
        let (modified, created) = parse_files(MODIFIED);
        assert!(modified.contains("src/auth/login.ts"));
        assert!(created.is_empty());
    }

    #[test]
    fn new_file_is_created_not_modified() {
        let (modified, created) = parse_files(CREATED);
        assert_eq!(created.into_iter().collect::<Vec<_>>(), vec!["src/new.ts"]);
        assert!(modified.is_empty());
    }

    #[test]
    fn null_preimage_alone_marks_created() {
        let diff = "diff --git a/lib/x.py b/lib/x.py
--- /dev/null
+++ b/lib/x.py
@@ -0,0 +1 @@
+print(1)
";
        let (modified, created) = parse_files(diff);
        assert!(created.contains("lib/x.py"));
        assert!(modified.is_empty());
    }

    #[test]
    fn empty_diff_yields_empty_sets() {
        let (m, c) = parse_files("");
        assert!(m.is_empty() && c.is_empty());
        let (m, c) = parse_files("just some text\nwithout headers\n");
        assert!(m.is_empty() && c.is_empty());
    }

    #[test]
    fn created_takes_precedence_across_blocks() {
        let diff = format!("{CREATED}diff --git a/src/new.ts b/src/new.ts\n--- a/src/new.ts\n+++ b/src/new.ts\n@@ -1 +1 @@\n-a\n+b\n");
        let (modified, created) = parse_files(&diff);
        assert!(created.contains("src/new.ts"));
        assert!(modified.is_disjoint(&created));
    }

    #[test]
    fn removed_sql_comment_in_hunk_is_not_a_header() {
        let diff = "diff --git a/db/schema.sql b/db/schema.sql
--- a/db/schema.sql
+++ b/db/schema.sql
@@ -1,2 +1,1 @@
--- /dev/null
 select 1;
";
        let (modified, created) = parse_files(diff);
        assert!(modified.contains("db/schema.sql"));
        assert!(created.is_empty());
    }

    #[test]
    fn deleted_file_counts_as_modified() {
        let diff = "diff --git a/old.rs b/old.rs
deleted file mode 100644
--- a/old.rs
+++ /dev/null
@@ -1 +0,0 @@
-fn main() {}
";
        let blocks = split_blocks(diff);
        assert!(blocks[0].deleted);
        let (modified, created) = parse_files(diff);
        assert!(modified.contains("old.rs"));
        assert!(created.is_empty());
    }

    #[test]
    fn path_with_spaces_from_plus_header() {
        let diff = "diff --git a/docs/my notes.md b/docs/my notes.md
--- a/docs/my notes.md
+++ b/docs/my notes.md
@@ -1 +1 @@
-x
+y
";
        let (modified, _) = parse_files(diff);
        assert!(modified.contains("docs/my notes.md"));
    }

    #[test]
    fn quoted_header_opens_new_block() {
        let diff = r#"diff --git a/package.json b/package.json
--- a/package.json
+++ b/package.json
@@ -1,3 +1,4 @@
 {
+  "left-pad": "^1.3.0",
 }
diff --git "a/docs/caf\303\251.json" "b/docs/caf\303\251.json"
new file mode 100644
index 0000000..abc
--- /dev/null
+++ "b/docs/caf\303\251.json"
@@ -0,0 +1,3 @@
+{
+  "title": "menu"
+}
"#;
        let (modified, created) = parse_files(diff);
        assert_eq!(modified.into_iter().collect::<Vec<_>>(), vec!["package.json"]);
        assert_eq!(created.into_iter().collect::<Vec<_>>(), vec!["docs/café.json"]);
        let deps = parse_added_dependencies(diff);
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec!["left-pad"]);
    }

    #[test]
    fn quoted_header_without_plus_line() {
        let diff = "diff --git \"a/tab\\there.md\" \"b/tab\\there.md\"\nindex 1..2 100644\nBinary files differ\n";
        let (modified, _) = parse_files(diff);
        assert!(modified.contains("tab\there.md"));
    }

    #[test]
    fn package_json_dependency_detected() {
        let diff = r#"diff --git a/package.json b/package.json
--- a/package.json
+++ b/package.json
@@ -10,6 +10,8 @@
   "dependencies": {
+    "axios-retry": "^1.2.3",
+    "version": "2.0.0",
     "react": "^18.0.0"
   }
 }
"#;
        let deps = parse_added_dependencies(diff);
        assert!(deps.contains("axios-retry"));
        assert!(!deps.contains("version"));
        assert!(!deps.contains("react"));
    }

    #[test]
    fn requirements_pins_and_bare_names() {
        let diff = "diff --git a/requirements-dev.txt b/requirements-dev.txt
--- a/requirements-dev.txt
+++ b/requirements-dev.txt
@@ -1,2 +1,6 @@
 flask==2.0
+httpx==0.27.0
+uvicorn[standard]>=0.30
+pytest  # test runner
+-r base.txt
+not a package line
";
        let deps = parse_added_dependencies(diff);
        assert!(deps.contains("httpx"));
        assert!(deps.contains("uvicorn"));
        assert!(deps.contains("pytest"));
        assert!(!deps.contains("flask"));
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn dependency_keys_ignored_outside_manifests() {
        let diff = r#"diff --git a/src/config.ts b/src/config.ts
--- a/src/config.ts
+++ b/src/config.ts
@@ -1 +1,2 @@
+  "timeout": 30,
"#;
        assert!(parse_added_dependencies(diff).is_empty());
    }

    #[test]
    fn truncate_appends_marker() {
        let out = truncate("abcdefghij", 4);
        assert_eq!(out, format!("abcd{TRUNCATION_MARKER}"));
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn truncate_respects_char_boundary() {
        let out = truncate("héllo", 2);
        assert!(out.starts_with('h'));
        assert!(out.ends_with("[truncated]"));
    }

    #[test]
    fn sanitize_drops_replacement_lines() {
        let diff = "+ok line\n+bad \u{FFFD} line\n+another\n";
        assert_eq!(sanitize(diff), "+ok line\n+another\n");
        assert_eq!(sanitize("clean\n"), "clean\n");
    }
}
