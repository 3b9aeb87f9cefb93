use std::path::Path;

use docbot_extract::ExtractorRegistry;
use docbot_types::model::{EnvVar, PublicSymbol, RaisedError, ScopePlan, ScopeResult};

use crate::scanner::entrypoint_language;

/// Basenames that mark a file as a "key file" worth weighting heavily in
/// the deterministic summary (README/config/entrypoint-adjacent files).
const KEY_BASENAMES: &[&str] = &[
    "__init__.py",
    "main.py",
    "app.py",
    "server.py",
    "cli.py",
    "main.go",
    "main.rs",
    "lib.rs",
    "index.js",
    "index.ts",
    "README.md",
    "Cargo.toml",
    "package.json",
    "go.mod",
];

/// Deterministically explore one scope: extract every file in `plan.paths`
/// and fold the results into a [`ScopeResult`].
///
/// CPU-bound and synchronous by design (spec calls this "runs off the I/O
/// scheduler") — callers spawn it on a blocking task. A fallback summary is
/// synthesised here from counts; the pipeline's reduce stage may replace it
/// with an LLM-written one.
pub fn explore(plan: &ScopePlan, repo_root: &Path, registry: &ExtractorRegistry) -> ScopeResult {
    let mut public_api: Vec<PublicSymbol> = Vec::new();
    let mut env_vars: Vec<EnvVar> = Vec::new();
    let mut errors: Vec<RaisedError> = Vec::new();
    let mut imports: Vec<String> = Vec::new();
    let mut files: Vec<String> = Vec::new();
    let mut key_files: Vec<String> = Vec::new();
    let mut entrypoints: Vec<String> = Vec::new();
    let mut languages: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    let mut loc_total: u32 = 0;

    for rel_path in &plan.paths {
        let ext = Path::new(rel_path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let language = match language_for_extension(&ext) {
            Some(l) => l,
            None => continue,
        };

        let abs_path = repo_root.join(rel_path);
        let extraction = registry.extract(&abs_path, rel_path, language);

        public_api.extend(extraction.symbols);
        env_vars.extend(extraction.env_vars);
        errors.extend(extraction.errors);
        imports.extend(extraction.imports);
        loc_total += extraction.loc;
        files.push(rel_path.clone());
        languages.insert(language.to_string());

        if is_key_basename(rel_path) {
            key_files.push(rel_path.clone());
        }
        if is_entrypoint_basename(rel_path) {
            entrypoints.push(rel_path.clone());
        }
    }

    dedupe_symbols(&mut public_api);
    dedupe_env_vars(&mut env_vars);
    dedupe_errors(&mut errors);
    imports.sort();
    imports.dedup();
    key_files.sort();
    entrypoints.sort();

    let summary = template_summary(plan, files.len(), loc_total, key_files.len(), &public_api);

    ScopeResult {
        scope_id: plan.scope_id.clone(),
        title: plan.title.clone(),
        summary,
        key_files,
        entrypoints,
        public_api,
        env_vars,
        errors,
        imports,
        languages: languages.into_iter().collect(),
        open_questions: Vec::new(),
        file_count: files.len() as u32,
        files,
        loc_total,
        error: None,
    }
}

fn language_for_extension(ext: &str) -> Option<&'static str> {
    const TABLE: &[(&str, &str)] = &[
        (".py", "python"),
        (".ts", "typescript"),
        (".tsx", "typescript"),
        (".js", "javascript"),
        (".jsx", "javascript"),
        (".go", "go"),
        (".rs", "rust"),
        (".java", "java"),
        (".kt", "kotlin"),
        (".cs", "csharp"),
        (".swift", "swift"),
        (".rb", "ruby"),
        (".cpp", "cpp"),
        (".c", "c"),
        (".h", "c"),
        (".hpp", "cpp"),
    ];
    TABLE.iter().find(|(e, _)| *e == ext).map(|(_, l)| *l)
}

fn is_key_basename(rel_path: &str) -> bool {
    let basename = Path::new(rel_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    KEY_BASENAMES.contains(&basename.as_str())
}

fn is_entrypoint_basename(rel_path: &str) -> bool {
    let basename = Path::new(rel_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    entrypoint_language(&basename).is_some()
}

fn template_summary(
    plan: &ScopePlan,
    file_count: usize,
    loc_total: u32,
    key_file_count: usize,
    public_api: &[PublicSymbol],
) -> String {
    let names: Vec<&str> = public_api.iter().take(5).map(|s| s.name.as_str()).collect();
    let names_clause = if names.is_empty() {
        String::new()
    } else {
        format!(" Notable public symbols: {}.", names.join(", "))
    };
    format!(
        "{} spans {file_count} file(s) totalling {loc_total} line(s) of code, including {key_file_count} key file(s).{names_clause}",
        plan.title
    )
}

fn dedupe_symbols(symbols: &mut Vec<PublicSymbol>) {
    let mut seen = std::collections::HashSet::new();
    symbols.retain(|s| seen.insert((s.citation.file.clone(), s.name.clone())));
    symbols.sort_by(|a, b| (&a.citation.file, &a.name).cmp(&(&b.citation.file, &b.name)));
}

fn dedupe_env_vars(env_vars: &mut Vec<EnvVar>) {
    let mut seen = std::collections::HashSet::new();
    env_vars.retain(|e| seen.insert(e.name.clone()));
    env_vars.sort_by(|a, b| a.name.cmp(&b.name));
}

fn dedupe_errors(errors: &mut Vec<RaisedError>) {
    let mut seen = std::collections::HashSet::new();
    errors.retain(|e| seen.insert((e.citation.file.clone(), e.error_type.clone(), e.citation.line_start)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explores_scope_and_produces_deterministic_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.py"),
            "import os\n\ndef run():\n    \"\"\"Entrypoint.\"\"\"\n    return os.getenv(\"PORT\")\n",
        )
        .unwrap();

        let plan = ScopePlan {
            scope_id: "root".to_string(),
            title: "Root".to_string(),
            paths: vec!["main.py".to_string()],
            rationale: None,
        };

        let registry = ExtractorRegistry::load();
        let result = explore(&plan, dir.path(), &registry);

        assert_eq!(result.file_count, 1);
        assert_eq!(result.public_api.len(), 1);
        assert_eq!(result.env_vars[0].name, "PORT");
        assert!(result.summary.contains("1 file(s)"));
        assert!(result.error.is_none());
    }

    #[test]
    fn skips_unrecognised_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
        let plan = ScopePlan {
            scope_id: "root".to_string(),
            title: "Root".to_string(),
            paths: vec!["notes.txt".to_string()],
            rationale: None,
        };
        let registry = ExtractorRegistry::load();
        let result = explore(&plan, dir.path(), &registry);
        assert_eq!(result.file_count, 0);
    }
}
