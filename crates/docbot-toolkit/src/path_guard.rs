//! Path sandboxing shared by every filesystem-touching tool.
//!
//! Every path an agent names must resolve inside `repo_root` — this is the
//! single invariant the rest of the toolkit leans on (spec invariant: every
//! path reachable via a tool satisfies `resolve(path).is_within(repo_root)`).

use std::path::{Component, Path, PathBuf};

/// Validate and resolve `requested` against `repo_root`.
///
/// Rejects absolute paths and raw `..` components before any filesystem
/// access, then canonicalizes and checks containment so a symlink can't be
/// used to escape the sandbox either.
pub fn validate_path(repo_root: &Path, requested: &str) -> Result<PathBuf, String> {
    let requested_path = Path::new(requested);
    if requested_path.is_absolute() {
        return Err(format!(
            "Error: path '{requested}' resolves outside the repository. Use a path relative to the repo root."
        ));
    }

    for component in requested_path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(format!(
                "Error: path '{requested}' resolves outside the repository. '..' components are not allowed."
            ));
        }
    }

    let canonical_root = repo_root
        .canonicalize()
        .map_err(|e| format!("cannot resolve repo root '{}': {e}", repo_root.display()))?;

    let candidate = canonical_root.join(requested_path);

    let resolved = if candidate.exists() {
        candidate
            .canonicalize()
            .map_err(|e| format!("cannot resolve path '{}': {e}", candidate.display()))?
    } else {
        let mut existing = candidate.as_path();
        let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
        loop {
            if existing.exists() {
                break;
            }
            match existing.parent() {
                Some(parent) => {
                    if let Some(name) = existing.file_name() {
                        tail.push(name);
                    }
                    existing = parent;
                }
                None => break,
            }
        }
        let mut resolved = existing
            .canonicalize()
            .map_err(|e| format!("cannot resolve ancestor of '{}': {e}", candidate.display()))?;
        for part in tail.into_iter().rev() {
            resolved.push(part);
        }
        resolved
    };

    if !resolved.starts_with(&canonical_root) {
        return Err(format!(
            "Error: path '{requested}' resolves outside the repository."
        ));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_parent_traversal() {
        let ws = TempDir::new().unwrap();
        let err = validate_path(ws.path(), "../../etc/passwd").unwrap_err();
        assert!(err.contains("resolves outside the repository"));
    }

    #[test]
    fn rejects_absolute_path() {
        let ws = TempDir::new().unwrap();
        let abs = if cfg!(windows) { "C:\\Windows" } else { "/etc/passwd" };
        let err = validate_path(ws.path(), abs).unwrap_err();
        assert!(err.contains("resolves outside the repository"));
    }

    #[test]
    fn accepts_existing_nested_file() {
        let ws = TempDir::new().unwrap();
        std::fs::create_dir_all(ws.path().join("src")).unwrap();
        std::fs::write(ws.path().join("src/lib.rs"), "fn main() {}").unwrap();
        let resolved = validate_path(ws.path(), "src/lib.rs").unwrap();
        assert!(resolved.ends_with("src/lib.rs"));
    }
}
