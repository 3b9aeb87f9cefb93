//! `read_file` tool: the raw-contents view an agent gets of a single file.

use std::path::Path;

const MAX_FILE_CHARS: usize = 12_000;

/// Read `rel_path` (already validated against the repo root) and format it
/// the way an agent expects: a `=== path ===` header followed by the
/// contents, truncated to [`MAX_FILE_CHARS`].
pub fn read_file(abs_path: &Path, rel_path: &str) -> Result<String, String> {
    let contents = std::fs::read_to_string(abs_path)
        .map_err(|e| format!("Error: could not read '{rel_path}': {e}"))?;

    let body = if contents.chars().count() > MAX_FILE_CHARS {
        let truncated: String = contents.chars().take(MAX_FILE_CHARS).collect();
        format!("{truncated}\n... (file truncated)")
    } else {
        contents
    };

    Ok(format!("=== {rel_path} ===\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn formats_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn main() {}").unwrap();
        let out = read_file(&path, "a.rs").unwrap();
        assert_eq!(out, "=== a.rs ===\nfn main() {}");
    }

    #[test]
    fn truncates_long_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.rs");
        std::fs::write(&path, "x".repeat(MAX_FILE_CHARS + 500)).unwrap();
        let out = read_file(&path, "big.rs").unwrap();
        assert!(out.ends_with("... (file truncated)"));
    }
}
