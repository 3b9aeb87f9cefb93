//! Diffing two runs, at both the summary and per-scope level.

use std::collections::HashSet;

use docbot_types::model::{
    DiffReport, DocSnapshot, GraphDelta, ScopeModification, ScopeResult, StatsDelta,
};

/// Compare two summary snapshots. Cheap — only reads what `save_snapshot`
/// already wrote, never touches per-scope files.
pub fn compute_diff(from: &DocSnapshot, to: &DocSnapshot) -> DiffReport {
    let from_ids: HashSet<&str> = from.scopes.iter().map(|s| s.scope_id.as_str()).collect();
    let to_ids: HashSet<&str> = to.scopes.iter().map(|s| s.scope_id.as_str()).collect();

    let added_scopes: Vec<String> = to_ids
        .difference(&from_ids)
        .map(|s| s.to_string())
        .collect();
    let removed_scopes: Vec<String> = from_ids
        .difference(&to_ids)
        .map(|s| s.to_string())
        .collect();

    let mut modified_scopes = Vec::new();
    for scope_id in from_ids.intersection(&to_ids) {
        let before = from.scopes.iter().find(|s| s.scope_id == *scope_id).unwrap();
        let after = to.scopes.iter().find(|s| s.scope_id == *scope_id).unwrap();
        if before.file_count != after.file_count
            || before.loc_total != after.loc_total
            || before.doc_hash != after.doc_hash
        {
            modified_scopes.push(ScopeModification {
                scope_id: scope_id.to_string(),
                added_files: Vec::new(),
                removed_files: Vec::new(),
                added_symbols: Vec::new(),
                removed_symbols: Vec::new(),
            });
        }
    }

    let graph_delta = if from.graph_digest != to.graph_digest {
        GraphDelta {
            added_edges: vec![],
            removed_edges: vec![],
        }
    } else {
        GraphDelta::default()
    };

    let stats_delta = StatsDelta {
        file_count_delta: to.stats.total_files as i64 - from.stats.total_files as i64,
        loc_delta: to.stats.total_loc as i64 - from.stats.total_loc as i64,
    };

    DiffReport {
        from_run_id: from.run_id.clone(),
        to_run_id: to.run_id.clone(),
        added_scopes,
        removed_scopes,
        modified_scopes,
        graph_delta,
        stats_delta,
    }
}

fn symbol_key(scope: &ScopeResult) -> HashSet<String> {
    scope
        .public_api
        .iter()
        .map(|s| format!("{}:{}", s.kind, s.name))
        .collect()
}

/// Full file/symbol-level diff for one scope, used once the caller has
/// loaded both full [`ScopeResult`]s (e.g. via `history::load_scope_result`).
pub fn compute_detailed_scope_diff(before: &ScopeResult, after: &ScopeResult) -> ScopeModification {
    let before_files: HashSet<&String> = before.files.iter().collect();
    let after_files: HashSet<&String> = after.files.iter().collect();

    let added_files: Vec<String> = after_files
        .difference(&before_files)
        .map(|s| s.to_string())
        .collect();
    let removed_files: Vec<String> = before_files
        .difference(&after_files)
        .map(|s| s.to_string())
        .collect();

    let before_symbols = symbol_key(before);
    let after_symbols = symbol_key(after);

    let added_symbols: Vec<String> = after_symbols
        .difference(&before_symbols)
        .cloned()
        .collect();
    let removed_symbols: Vec<String> = before_symbols
        .difference(&after_symbols)
        .cloned()
        .collect();

    ScopeModification {
        scope_id: after.scope_id.clone(),
        added_files,
        removed_files,
        added_symbols,
        removed_symbols,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docbot_types::model::{Citation, PublicSymbol, ScopeSummary, SnapshotStats};

    fn snapshot(run_id: &str, scopes: Vec<ScopeSummary>, files: u32) -> DocSnapshot {
        DocSnapshot {
            run_id: run_id.into(),
            created_at: Utc::now(),
            graph_digest: "abc".into(),
            scopes,
            stats: SnapshotStats {
                total_files: files,
                total_loc: files * 10,
                total_scopes: 1,
            },
        }
    }

    fn summary(id: &str, hash: &str) -> ScopeSummary {
        ScopeSummary {
            scope_id: id.into(),
            title: id.into(),
            file_count: 1,
            loc_total: 10,
            doc_hash: hash.into(),
        }
    }

    #[test]
    fn detects_added_and_removed_scopes() {
        let from = snapshot("r1", vec![summary("core", "h1")], 1);
        let to = snapshot("r2", vec![summary("web", "h2")], 1);
        let diff = compute_diff(&from, &to);
        assert_eq!(diff.added_scopes, vec!["web"]);
        assert_eq!(diff.removed_scopes, vec!["core"]);
    }

    #[test]
    fn detects_modified_scope_via_hash_change() {
        let from = snapshot("r1", vec![summary("core", "h1")], 1);
        let to = snapshot("r2", vec![summary("core", "h2")], 1);
        let diff = compute_diff(&from, &to);
        assert_eq!(diff.modified_scopes.len(), 1);
        assert_eq!(diff.modified_scopes[0].scope_id, "core");
    }

    #[test]
    fn detailed_diff_finds_symbol_changes() {
        let mut before = ScopeResult {
            scope_id: "core".into(),
            title: "core".into(),
            summary: "s".into(),
            key_files: vec![],
            entrypoints: vec![],
            public_api: vec![PublicSymbol {
                name: "old_fn".into(),
                kind: "function".into(),
                signature: None,
                docstring: None,
                citation: Citation::new("a.rs", None, 1, 2).unwrap(),
            }],
            env_vars: vec![],
            errors: vec![],
            imports: vec![],
            languages: vec![],
            open_questions: vec![],
            files: vec!["a.rs".into()],
            file_count: 1,
            loc_total: 5,
            error: None,
        };
        let mut after = before.clone();
        after.public_api = vec![PublicSymbol {
            name: "new_fn".into(),
            kind: "function".into(),
            signature: None,
            docstring: None,
            citation: Citation::new("a.rs", None, 1, 2).unwrap(),
        }];
        after.files = vec!["a.rs".into(), "b.rs".into()];
        before.file_count = 1;

        let diff = compute_detailed_scope_diff(&before, &after);
        assert_eq!(diff.added_files, vec!["b.rs"]);
        assert_eq!(diff.added_symbols, vec!["function:new_fn"]);
        assert_eq!(diff.removed_symbols, vec!["function:old_fn"]);
    }
}
