//! Stage 4: merge per-scope results into one [`DocsIndex`] (`C11`).
//!
//! Grounded on `original_source/reducer.py`: scope dependency edges are
//! inferred from each scope's collected `imports` via two strategies
//! (path-stem matching, then dotted-prefix matching), and any scope left
//! unconnected is wired to its nearest sibling by shared directory prefix
//! so `scope_edges` never strands an isolated scope (spec.md §1
//! Supplement's orphan-connection pass). `mermaid_graph` and
//! `cross_scope_analysis` are left empty here — they are LLM-only
//! enrichments applied by the orchestrator when an adapter is configured.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use docbot_types::model::{DocsIndex, EnvVar, PublicSymbol, ScopeResult};

const SOURCE_EXTS: &[&str] = &[
    ".py", ".ts", ".tsx", ".js", ".jsx", ".go", ".rs", ".java", ".kt", ".cs", ".swift", ".rb",
    ".cpp", ".c", ".h", ".hpp",
];

fn strip_source_ext(segment: &str) -> String {
    for ext in SOURCE_EXTS {
        if let Some(stripped) = segment.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    segment.to_string()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Infer directed `(from, to)` scope edges from import statements, then
/// connect any scope with no inferred edge to its closest (by shared
/// directory prefix) already-connected sibling.
fn compute_scope_edges(scopes: &[ScopeResult]) -> Vec<(String, String)> {
    let mut path_to_scope: HashMap<String, String> = HashMap::new();
    let mut prefix_to_scope: HashMap<String, String> = HashMap::new();

    for scope in scopes {
        for path in &scope.files {
            let stem = strip_source_ext(path);
            path_to_scope.insert(stem.clone(), scope.scope_id.clone());
            path_to_scope.insert(basename(&stem).to_string(), scope.scope_id.clone());

            let parts: Vec<&str> = path.split('/').collect();
            for i in 1..=parts.len() {
                let mut segment: Vec<String> = parts[..i].iter().map(|s| s.to_string()).collect();
                if let Some(last) = segment.last_mut() {
                    *last = strip_source_ext(last);
                }
                prefix_to_scope.insert(segment.join("."), scope.scope_id.clone());
            }
        }
    }

    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();

    for scope in scopes {
        for import in &scope.imports {
            let mut found = false;

            let normalised_raw = import.trim_start_matches("./").replace('\\', "/");
            let normalised = strip_source_ext(&normalised_raw);
            if let Some(target) = path_to_scope.get(&normalised) {
                if target != &scope.scope_id {
                    edges.insert((scope.scope_id.clone(), target.clone()));
                    found = true;
                }
            }

            if !found {
                let parts: Vec<&str> = import.split('.').collect();
                for i in (1..=parts.len()).rev() {
                    let candidate = parts[..i].join(".");
                    if let Some(target) = prefix_to_scope.get(&candidate) {
                        if target != &scope.scope_id {
                            edges.insert((scope.scope_id.clone(), target.clone()));
                            break;
                        }
                    }
                }
            }
        }
    }

    let connected: HashSet<&str> = edges
        .iter()
        .flat_map(|(a, b)| [a.as_str(), b.as_str()])
        .collect();
    let all_ids: HashSet<&str> = scopes.iter().map(|s| s.scope_id.as_str()).collect();
    let orphans: Vec<&str> = all_ids.difference(&connected).copied().collect();

    if !orphans.is_empty() {
        let mut scope_dirs: HashMap<&str, String> = HashMap::new();
        for scope in scopes {
            if let Some(first) = scope.files.first() {
                let parts: Vec<&str> = first.split('/').collect();
                let dir = if parts.len() > 1 { parts[..2].join("/") } else { parts[0].to_string() };
                scope_dirs.insert(scope.scope_id.as_str(), dir);
            }
        }

        for orphan in orphans {
            let orphan_dir = scope_dirs.get(orphan).cloned().unwrap_or_default();
            let mut best: Option<(&str, usize)> = None;
            for candidate in &connected {
                let candidate_dir = scope_dirs.get(candidate).cloned().unwrap_or_default();
                let common = common_prefix_len(&orphan_dir, &candidate_dir);
                if best.map(|(_, len)| common > len).unwrap_or(common > 0) {
                    best = Some((candidate, common));
                }
            }
            if let Some((target, _)) = best {
                edges.insert((orphan.to_string(), target.to_string()));
            }
        }
    }

    edges.into_iter().filter(|(a, b)| a != b).collect()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn dedupe_env_vars(scopes: &[ScopeResult]) -> Vec<EnvVar> {
    let mut seen = HashSet::new();
    let mut out: Vec<EnvVar> = Vec::new();
    for scope in scopes {
        for env in &scope.env_vars {
            if seen.insert(env.name.clone()) {
                out.push(env.clone());
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn dedupe_public_api(scopes: &[ScopeResult]) -> Vec<PublicSymbol> {
    let mut seen = HashSet::new();
    let mut out: Vec<PublicSymbol> = Vec::new();
    for scope in scopes {
        for symbol in &scope.public_api {
            let key = (symbol.citation.file.clone(), symbol.name.clone());
            if seen.insert(key) {
                out.push(symbol.clone());
            }
        }
    }
    out.sort_by(|a, b| (&a.citation.file, &a.name).cmp(&(&b.citation.file, &b.name)));
    out
}

fn dedupe_entrypoints(scopes: &[ScopeResult]) -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();
    for scope in scopes {
        set.extend(scope.entrypoints.iter().cloned());
    }
    set.into_iter().collect()
}

fn dedupe_languages(scopes: &[ScopeResult]) -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();
    for scope in scopes {
        set.extend(scope.languages.iter().cloned());
    }
    set.into_iter().collect()
}

/// Merge `scopes` (already sorted by `scope_id` by the caller, per spec.md
/// §5's ordering guarantee) into a [`DocsIndex`]. Idempotent except for
/// `generated_at` and `run_id`: calling this twice on the same scope list
/// produces the same scopes, edges, and deduped globals.
pub fn reduce(scopes: Vec<ScopeResult>, repo_path: &str, run_id: &str) -> DocsIndex {
    let mut scopes = scopes;
    scopes.sort_by(|a, b| a.scope_id.cmp(&b.scope_id));

    let scope_edges = compute_scope_edges(&scopes);
    let env_vars = dedupe_env_vars(&scopes);
    let public_api = dedupe_public_api(&scopes);
    let entrypoints = dedupe_entrypoints(&scopes);
    let languages = dedupe_languages(&scopes);

    DocsIndex {
        repo_path: repo_path.to_string(),
        run_id: run_id.to_string(),
        generated_at: Utc::now(),
        scopes,
        scope_edges,
        languages,
        env_vars,
        public_api,
        entrypoints,
        mermaid_graph: String::new(),
        cross_scope_analysis: String::new(),
        tours: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_types::model::ScopeResult;

    fn scope(id: &str, files: &[&str], imports: &[&str]) -> ScopeResult {
        ScopeResult {
            scope_id: id.to_string(),
            title: id.to_string(),
            summary: String::new(),
            key_files: vec![],
            entrypoints: vec![],
            public_api: vec![],
            env_vars: vec![],
            errors: vec![],
            imports: imports.iter().map(|s| s.to_string()).collect(),
            languages: vec!["python".to_string()],
            open_questions: vec![],
            files: files.iter().map(|s| s.to_string()).collect(),
            file_count: files.len() as u32,
            loc_total: 0,
            error: None,
        }
    }

    #[test]
    fn infers_edge_from_dotted_import() {
        let scopes = vec![
            scope("api", &["api/handlers.py"], &["util.auth"]),
            scope("util", &["util/auth.py"], &[]),
        ];
        let index = reduce(scopes, "/repo", "run1");
        assert!(index.scope_edges.contains(&("api".to_string(), "util".to_string())));
    }

    #[test]
    fn no_self_loops() {
        let scopes = vec![scope("api", &["api/handlers.py"], &["api.handlers"])];
        let index = reduce(scopes, "/repo", "run1");
        assert!(index.scope_edges.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn connects_orphan_scope_by_directory_prefix() {
        let scopes = vec![
            scope("api", &["src/api/handlers.py"], &["util.auth"]),
            scope("util", &["src/util/auth.py"], &[]),
            scope("docs", &["src/docs/readme.py"], &[]),
        ];
        let index = reduce(scopes, "/repo", "run1");
        assert!(index.scope_edges.iter().any(|(a, _)| a == "docs"));
    }

    #[test]
    fn reduce_is_idempotent_apart_from_timestamp() {
        let scopes = vec![scope("api", &["api/handlers.py"], &[])];
        let first = reduce(scopes.clone(), "/repo", "run1");
        let second = reduce(first.scopes.clone(), "/repo", "run1");
        assert_eq!(first.scope_edges, second.scope_edges);
        assert_eq!(first.scopes.len(), second.scopes.len());
    }
}
