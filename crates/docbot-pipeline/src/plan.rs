//! Stage 2: partition the scan into [`ScopePlan`]s (`C11`).
//!
//! Grounded on `original_source/planner.py::build_plan`: entrypoints and
//! cross-cutting concerns (config/logging/auth/middleware/utils/...) are
//! carved out into their own scopes first, everything else is grouped by
//! top-level directory (`src/<pkg>` counts as one level deeper), and the
//! plan is capped at `max_scopes` by keeping the two reserved scopes and
//! the largest remaining groups.

use std::collections::BTreeMap;

use docbot_explore::scanner::ScanResult;
use docbot_types::model::ScopePlan;
use regex::Regex;

fn crosscutting_re() -> Regex {
    Regex::new(
        r"(?i)(config|settings|conf|log|logging|auth|middleware|errors|exceptions|security|permissions|utils|helpers|common|shared|types|models)",
    )
    .expect("static regex")
}

fn top_level_key(rel_path: &str) -> String {
    let parts: Vec<&str> = rel_path.split('/').collect();
    if parts.len() <= 1 {
        return "<root>".to_string();
    }
    if parts[0] == "src" && parts.len() > 2 {
        return format!("src/{}", parts[1]);
    }
    parts[0].to_string()
}

fn is_crosscutting(rel_path: &str, re: &Regex) -> bool {
    let stem = std::path::Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    re.is_match(&stem) || re.is_match(rel_path)
}

fn slugify(key: &str) -> String {
    let lowered = key.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let mut out = String::new();
    let mut last_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !last_underscore {
                out.push(c);
            }
            last_underscore = true;
        } else {
            out.push(c);
            last_underscore = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Build a deterministic scope plan (no LLM). `max_scopes` caps the
/// returned count; `entrypoints` and `crosscutting` scopes are always
/// kept, the rest is sorted by file count descending before truncation.
pub fn build_plan(scan: &ScanResult, max_scopes: usize) -> Vec<ScopePlan> {
    let re = crosscutting_re();
    let entrypoint_set: std::collections::HashSet<&str> =
        scan.entrypoints.iter().map(|s| s.as_str()).collect();

    let mut entrypoint_files: Vec<String> = Vec::new();
    let mut crosscutting_files: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for file in &scan.source_files {
        let path = &file.path;
        if entrypoint_set.contains(path.as_str()) {
            entrypoint_files.push(path.clone());
        }
        if is_crosscutting(path, &re) {
            crosscutting_files.push(path.clone());
            continue;
        }
        let key = top_level_key(path);
        groups.entry(key).or_default().push(path.clone());
    }

    let mut scopes: Vec<ScopePlan> = Vec::new();

    if !entrypoint_files.is_empty() {
        entrypoint_files.sort();
        entrypoint_files.dedup();
        scopes.push(ScopePlan {
            scope_id: "entrypoints".to_string(),
            title: "Entrypoints".to_string(),
            paths: entrypoint_files,
            rationale: Some("Application entrypoint files detected by naming convention.".to_string()),
        });
    }

    if !crosscutting_files.is_empty() {
        crosscutting_files.sort();
        crosscutting_files.dedup();
        scopes.push(ScopePlan {
            scope_id: "crosscutting".to_string(),
            title: "Cross-cutting concerns".to_string(),
            paths: crosscutting_files,
            rationale: Some(
                "Config, logging, auth, middleware, error-handling, and shared utility modules."
                    .to_string(),
            ),
        });
    }

    for (key, mut paths) in groups {
        paths.sort();
        let scope_id = slugify(&key);
        if scope_id.is_empty() {
            continue;
        }
        scopes.push(ScopePlan {
            scope_id,
            title: if key == "<root>" { "Root-level modules".to_string() } else { key },
            paths,
            rationale: None,
        });
    }

    if scopes.len() > max_scopes {
        let (reserved, mut rest): (Vec<ScopePlan>, Vec<ScopePlan>) = scopes
            .into_iter()
            .partition(|s| s.scope_id == "entrypoints" || s.scope_id == "crosscutting");
        rest.sort_by(|a, b| b.paths.len().cmp(&a.paths.len()).then_with(|| a.scope_id.cmp(&b.scope_id)));
        let budget = max_scopes.saturating_sub(reserved.len());
        let dropped = rest.len().saturating_sub(budget);
        if dropped > 0 {
            tracing::warn!(dropped, max_scopes, "plan exceeded max_scopes, dropping smallest groups");
        }
        rest.truncate(budget);
        scopes = reserved.into_iter().chain(rest).collect();
    }

    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_types::model::SourceFile;

    fn file(path: &str) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            language: "python".to_string(),
            size_bytes: 10,
            is_entrypoint: false,
        }
    }

    #[test]
    fn separates_entrypoints_and_crosscutting_and_groups_rest() {
        let scan = ScanResult {
            source_files: vec![
                file("main.py"),
                file("util/auth.py"),
                file("api/handlers.py"),
                file("api/routes.py"),
            ],
            packages: vec![],
            entrypoints: vec!["main.py".to_string()],
            languages: vec!["python".to_string()],
        };

        let plans = build_plan(&scan, 20);
        let ids: Vec<&str> = plans.iter().map(|p| p.scope_id.as_str()).collect();
        assert!(ids.contains(&"entrypoints"));
        assert!(ids.contains(&"crosscutting"));
        let api_scope = plans.iter().find(|p| p.scope_id == "api").unwrap();
        assert_eq!(api_scope.paths.len(), 2);
    }

    #[test]
    fn caps_at_max_scopes_keeping_reserved_and_largest() {
        let mut files = vec![file("main.py")];
        for i in 0..10 {
            files.push(file(&format!("pkg{i}/mod.py")));
        }
        let scan = ScanResult {
            source_files: files,
            packages: vec![],
            entrypoints: vec!["main.py".to_string()],
            languages: vec!["python".to_string()],
        };

        let plans = build_plan(&scan, 3);
        assert!(plans.len() <= 3);
        assert!(plans.iter().any(|p| p.scope_id == "entrypoints"));
    }

    #[test]
    fn slugify_produces_lowercase_identifier_slugs() {
        assert_eq!(slugify("src/Web App"), "src_web_app");
        assert_eq!(slugify("<root>"), "root");
    }
}
