//! Snapshot history under `.docbot/history/`.
//!
//! Each run that completes writes one `<run_id>.json` summary
//! ([`DocSnapshot`]) plus, in a same-named directory, one full
//! [`ScopeResult`] per scope — the summary is enough for a fast
//! [`crate::diff::compute_diff`], the per-scope files back the detailed
//! variant when a caller asks for it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use docbot_types::error::{Error, Result};
use docbot_types::model::{DocSnapshot, DocsIndex, ScopeResult, ScopeSummary, SnapshotStats};
use sha2::{Digest, Sha256};

fn history_dir(docbot_dir: &Path) -> PathBuf {
    docbot_dir.join("history")
}

fn doc_hash(scope: &ScopeResult) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scope.summary.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

fn graph_digest(index: &DocsIndex) -> String {
    if index.scope_edges.is_empty() {
        return String::new();
    }
    let mut edges = index.scope_edges.clone();
    edges.sort();
    let encoded = serde_json::to_vec(&edges).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hex::encode(hasher.finalize())[..16].to_string()
}

fn compute_stats(index: &DocsIndex) -> SnapshotStats {
    SnapshotStats {
        total_files: index.scopes.iter().map(|s| s.file_count).sum(),
        total_loc: index.scopes.iter().map(|s| s.loc_total).sum(),
        total_scopes: index.scopes.len() as u32,
    }
}

/// Persist a completed run: the summary snapshot plus one file per scope.
pub fn save_snapshot(docbot_dir: &Path, index: &DocsIndex) -> Result<DocSnapshot> {
    let dir = history_dir(docbot_dir);
    std::fs::create_dir_all(&dir)?;

    let scope_summaries: Vec<ScopeSummary> = index
        .scopes
        .iter()
        .map(|s| ScopeSummary {
            scope_id: s.scope_id.clone(),
            title: s.title.clone(),
            file_count: s.file_count,
            loc_total: s.loc_total,
            doc_hash: doc_hash(s),
        })
        .collect();

    let snapshot = DocSnapshot {
        run_id: index.run_id.clone(),
        created_at: Utc::now(),
        graph_digest: graph_digest(index),
        scopes: scope_summaries,
        stats: compute_stats(index),
    };

    let scope_dir = dir.join(&index.run_id);
    std::fs::create_dir_all(&scope_dir)?;
    for scope in &index.scopes {
        let scope_path = scope_dir.join(format!("{}.json", scope.scope_id));
        let tmp = scope_dir.join(format!("{}.json.tmp", scope.scope_id));
        let raw = serde_json::to_string_pretty(scope).map_err(Error::Json)?;
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &scope_path)?;
    }

    // The summary file is written last and atomically: a reader (e.g.
    // `list_snapshots`) must never observe a summary whose per-scope
    // files aren't all on disk yet.
    let summary_path = dir.join(format!("{}.json", index.run_id));
    let summary_tmp = dir.join(format!("{}.json.tmp", index.run_id));
    let raw = serde_json::to_string_pretty(&snapshot).map_err(Error::Json)?;
    std::fs::write(&summary_tmp, raw)?;
    std::fs::rename(&summary_tmp, &summary_path)?;

    Ok(snapshot)
}

pub fn load_snapshot(docbot_dir: &Path, run_id: &str) -> Option<DocSnapshot> {
    let path = history_dir(docbot_dir).join(format!("{run_id}.json"));
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn load_scope_result(docbot_dir: &Path, run_id: &str, scope_id: &str) -> Option<ScopeResult> {
    let path = history_dir(docbot_dir)
        .join(run_id)
        .join(format!("{scope_id}.json"));
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// List all saved snapshots, newest first. Invalid files are skipped
/// silently — a corrupt snapshot should never block `docbot diff`.
pub fn list_snapshots(docbot_dir: &Path) -> Vec<DocSnapshot> {
    let dir = history_dir(docbot_dir);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut snapshots: Vec<DocSnapshot> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .filter_map(|e| std::fs::read_to_string(e.path()).ok())
        .filter_map(|raw| serde_json::from_str::<DocSnapshot>(&raw).ok())
        .collect();

    snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    snapshots
}

/// Keep only the newest `max_count` snapshots, deleting the rest (both the
/// summary file and its per-scope directory). Returns the number removed.
pub fn prune_snapshots(docbot_dir: &Path, max_count: usize) -> Result<usize> {
    let snapshots = list_snapshots(docbot_dir);
    if snapshots.len() <= max_count {
        return Ok(0);
    }

    let dir = history_dir(docbot_dir);
    let mut removed = 0;
    for snapshot in snapshots.into_iter().skip(max_count) {
        let summary_path = dir.join(format!("{}.json", snapshot.run_id));
        let scope_dir = dir.join(&snapshot.run_id);
        let _ = std::fs::remove_file(&summary_path);
        let _ = std::fs::remove_dir_all(&scope_dir);
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_types::model::ScopeResult;
    use tempfile::TempDir;

    fn scope(id: &str) -> ScopeResult {
        ScopeResult {
            scope_id: id.into(),
            title: id.into(),
            summary: format!("summary for {id}"),
            key_files: Vec::new(),
            entrypoints: Vec::new(),
            public_api: Vec::new(),
            env_vars: Vec::new(),
            errors: Vec::new(),
            imports: Vec::new(),
            languages: Vec::new(),
            open_questions: Vec::new(),
            files: vec![format!("{id}/mod.rs")],
            file_count: 1,
            loc_total: 10,
            error: None,
        }
    }

    fn index(run_id: &str, scopes: Vec<ScopeResult>) -> DocsIndex {
        DocsIndex {
            repo_path: "/repo".into(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            scopes,
            scope_edges: vec![],
            languages: vec![],
            env_vars: vec![],
            public_api: vec![],
            entrypoints: vec![],
            mermaid_graph: String::new(),
            cross_scope_analysis: String::new(),
            tours: vec![],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let idx = index("run1", vec![scope("core")]);
        save_snapshot(dir.path(), &idx).unwrap();

        let snap = load_snapshot(dir.path(), "run1").unwrap();
        assert_eq!(snap.run_id, "run1");
        assert_eq!(snap.stats.total_scopes, 1);

        let scope_result = load_scope_result(dir.path(), "run1", "core").unwrap();
        assert_eq!(scope_result.scope_id, "core");
    }

    #[test]
    fn prune_keeps_only_newest() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            let idx = index(&format!("run{i}"), vec![scope("core")]);
            save_snapshot(dir.path(), &idx).unwrap();
        }
        let removed = prune_snapshots(dir.path(), 2).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(list_snapshots(dir.path()).len(), 2);
    }
}
