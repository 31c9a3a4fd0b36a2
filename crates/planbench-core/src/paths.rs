use std::collections::BTreeSet;

/// Normalize a repo-relative path for set comparison: trim, strip leading
/// `./` segments and collapse runs of `/`. Repeats until nothing changes, so
/// it is idempotent even when stripping exposes more whitespace.
pub fn normalize_path(path: &str) -> String {
    let mut current = normalize_once(path);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.trim().chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }

    let mut rest = collapsed.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.trim().to_string()
}

/// Normalize every path of a collection into a set.
pub fn normalize_all<'a, I>(paths: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    paths
        .into_iter()
        .map(|p| normalize_path(p))
        .filter(|p| !p.is_empty())
        .collect()
}
