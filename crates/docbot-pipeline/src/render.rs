//! Stage 5: render a [`DocsIndex`] to markdown under `.docbot/docs/` (`C11`).
//!
//! Grounded on the renderer exercised by
//! `original_source/tests/test_renderer_llm_event_loop.py`: one top-level
//! overview (`docs/index.md`), one architecture page carrying the mermaid
//! graph and cross-scope analysis when present (`docs/architecture.md`),
//! and one page per scope (`docs/modules/<scope_id>.md`). Deterministic —
//! the same `DocsIndex` always renders to the same bytes, modulo
//! `generated_at`.

use std::path::{Path, PathBuf};

use docbot_types::error::Result;
use docbot_types::model::DocsIndex;

fn docs_dir(docbot_dir: &Path) -> PathBuf {
    docbot_dir.join("docs")
}

/// Render the full doc set, returning the paths written (relative to
/// nothing in particular — callers log them as-is).
pub fn render(index: &DocsIndex, docbot_dir: &Path) -> Result<Vec<PathBuf>> {
    let docs = docs_dir(docbot_dir);
    let modules_dir = docs.join("modules");
    std::fs::create_dir_all(&modules_dir)?;

    let mut written = Vec::new();

    let index_path = docs.join("index.md");
    std::fs::write(&index_path, render_index(index))?;
    written.push(index_path);

    let arch_path = docs.join("architecture.md");
    std::fs::write(&arch_path, render_architecture(index))?;
    written.push(arch_path);

    for scope in &index.scopes {
        let scope_path = modules_dir.join(format!("{}.md", scope.scope_id));
        std::fs::write(&scope_path, render_scope(scope))?;
        written.push(scope_path);
    }

    Ok(written)
}

fn render_index(index: &DocsIndex) -> String {
    let mut out = format!(
        "# {}\n\nGenerated {} (run `{}`).\n\n",
        index.repo_path, index.generated_at.to_rfc3339(), index.run_id
    );

    if !index.languages.is_empty() {
        out.push_str(&format!("**Languages:** {}\n\n", index.languages.join(", ")));
    }
    if !index.entrypoints.is_empty() {
        out.push_str("**Entrypoints:**\n");
        for ep in &index.entrypoints {
            out.push_str(&format!("- `{ep}`\n"));
        }
        out.push('\n');
    }

    out.push_str("## Scopes\n\n");
    for scope in &index.scopes {
        let status = if scope.error.is_some() { " (failed)" } else { "" };
        out.push_str(&format!(
            "- [{}](modules/{}.md){status} — {} file(s), {} line(s)\n",
            scope.title, scope.scope_id, scope.file_count, scope.loc_total
        ));
    }

    out
}

fn render_architecture(index: &DocsIndex) -> String {
    let mut out = String::from("# Architecture\n\n");

    if !index.cross_scope_analysis.is_empty() {
        out.push_str(&index.cross_scope_analysis);
        out.push_str("\n\n");
    } else {
        out.push_str("_No cross-scope analysis available (no_llm mode)._\n\n");
    }

    out.push_str("## Scope graph\n\n");
    if index.mermaid_graph.is_empty() {
        if index.scope_edges.is_empty() {
            out.push_str("_No dependency edges detected._\n\n");
        } else {
            out.push_str("```\n");
            for (from, to) in &index.scope_edges {
                out.push_str(&format!("{from} -> {to}\n"));
            }
            out.push_str("```\n\n");
        }
    } else {
        out.push_str("```mermaid\n");
        out.push_str(&index.mermaid_graph);
        out.push_str("\n```\n\n");
    }

    out
}

fn render_scope(scope: &docbot_types::model::ScopeResult) -> String {
    let mut out = format!("# {}\n\n{}\n\n", scope.title, scope.summary);

    if let Some(err) = &scope.error {
        out.push_str(&format!("> **Error:** {err}\n\n"));
    }

    if !scope.entrypoints.is_empty() {
        out.push_str("## Entrypoints\n\n");
        for ep in &scope.entrypoints {
            out.push_str(&format!("- `{ep}`\n"));
        }
        out.push('\n');
    }

    if !scope.public_api.is_empty() {
        out.push_str("## Public API\n\n");
        for symbol in &scope.public_api {
            let sig = symbol.signature.as_deref().unwrap_or("");
            out.push_str(&format!(
                "- `{}` ({}) {} — {}:{}\n",
                symbol.name, symbol.kind, sig, symbol.citation.file, symbol.citation.line_start
            ));
        }
        out.push('\n');
    }

    if !scope.env_vars.is_empty() {
        out.push_str("## Environment variables\n\n");
        for env in &scope.env_vars {
            match &env.default {
                Some(default) => out.push_str(&format!("- `{}` (default: `{default}`)\n", env.name)),
                None => out.push_str(&format!("- `{}`\n", env.name)),
            }
        }
        out.push('\n');
    }

    if !scope.open_questions.is_empty() {
        out.push_str("## Open questions\n\n");
        for q in &scope.open_questions {
            out.push_str(&format!("- {q}\n"));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docbot_types::model::ScopeResult;
    use tempfile::TempDir;

    fn index() -> DocsIndex {
        DocsIndex {
            repo_path: "/repo".into(),
            run_id: "run1".into(),
            generated_at: Utc::now(),
            scopes: vec![ScopeResult {
                scope_id: "core".into(),
                title: "Core".into(),
                summary: "Core module".into(),
                key_files: vec![],
                entrypoints: vec!["main.py".into()],
                public_api: vec![],
                env_vars: vec![],
                errors: vec![],
                imports: vec![],
                languages: vec!["python".into()],
                open_questions: vec![],
                files: vec!["main.py".into()],
                file_count: 1,
                loc_total: 10,
                error: None,
            }],
            scope_edges: vec![],
            languages: vec!["python".into()],
            env_vars: vec![],
            public_api: vec![],
            entrypoints: vec!["main.py".into()],
            mermaid_graph: String::new(),
            cross_scope_analysis: String::new(),
            tours: vec![],
        }
    }

    #[test]
    fn renders_index_architecture_and_per_scope_pages() {
        let dir = TempDir::new().unwrap();
        let written = render(&index(), dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("docs/index.md").exists());
        assert!(dir.path().join("docs/architecture.md").exists());
        assert!(dir.path().join("docs/modules/core.md").exists());

        let scope_md = std::fs::read_to_string(dir.path().join("docs/modules/core.md")).unwrap();
        assert!(scope_md.contains("Core module"));
        assert!(scope_md.contains("main.py"));
    }
}
