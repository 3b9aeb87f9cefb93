//! Stage 1: scan the repository tree (spec.md §4.9/§4.11, `C11`).
//!
//! Thin wrapper around [`docbot_explore::scan_repo`] that turns the scan
//! into a fatal *planner error* when it genuinely couldn't walk the repo,
//! and otherwise hands the raw [`ScanResult`](docbot_explore::scanner::ScanResult)
//! to the planner — an empty result (no source files) is NOT an error
//! here, it is scenario S1 and the orchestrator handles it by producing an
//! empty `DocsIndex` rather than failing the run.

use std::path::Path;

use docbot_explore::scanner::ScanResult;
use docbot_types::error::{Error, Result};

pub fn scan(repo_root: &Path) -> Result<ScanResult> {
    if !repo_root.is_dir() {
        return Err(Error::other(format!(
            "repo root '{}' is not a directory",
            repo_root.display()
        )));
    }

    let result = docbot_explore::scan_repo(repo_root)?;

    tracing::info!(
        files = result.source_files.len(),
        packages = result.packages.len(),
        entrypoints = result.entrypoints.len(),
        languages = result.languages.len(),
        "scan complete"
    );

    if result.source_files.is_empty() {
        tracing::warn!("scan found no recognised source files");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_repo_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        let result = scan(dir.path()).unwrap();
        assert!(result.source_files.is_empty());
    }

    #[test]
    fn missing_directory_is_a_planner_error() {
        let err = scan(Path::new("/no/such/path/docbot-test")).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
