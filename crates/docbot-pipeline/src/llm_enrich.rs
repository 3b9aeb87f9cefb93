//! LLM-only enrichment applied on top of the deterministic pipeline.
//!
//! Two independent pieces, both optional and both best-effort: a per-scope
//! richer summary (grounded on
//! `original_source/agents/scope_agent.py::_build_scope_context` +
//! `run_scope_agent`, driving the recursive agent engine for one scope's
//! own tree) and a cross-scope analysis + Mermaid architecture diagram
//! generated once for the whole run (grounded on
//! `original_source/reducer.py::reduce_with_llm`, whose two prompts —
//! `_ANALYSIS_PROMPT` and `_MERMAID_PROMPT` — are reproduced here nearly
//! verbatim). Both fire in parallel and both swallow failures into a log
//! line rather than the run: `cross_scope_analysis`/`mermaid_graph` simply
//! stay empty, same as `no_llm` mode.

use std::sync::Arc;

use docbot_engine::engine::{run_agent, AgentInput, RunContext};
use docbot_llm::{ChatRequest, LlmAdapter};
use docbot_types::cancel::CancelToken;
use docbot_types::model::{DocsIndex, NodeId, NodeKind, ScopePlan, ScopeResult};
use docbot_types::tool::Message;

const ANALYSIS_SYSTEM: &str = "You are a technical writer explaining how a software project works \
to a new developer. Write clearly and concisely. Focus on the big picture -- what the program does \
and how it works -- not on individual files or symbols.";

const MERMAID_SYSTEM: &str = "You are a software architect creating a clean, readable Mermaid system \
architecture diagram based on analyzed codebase data. Show HOW the system works -- components, data \
flows, external dependencies -- NOT the file/directory structure. Return ONLY valid Mermaid syntax \
starting with \"graph TD\". No markdown fences, no commentary. Define each node exactly once.";

/// Build the initial context block handed to a scope's top-level agent,
/// mirroring `scope_agent.py::_build_scope_context` field-for-field.
pub fn build_scope_context(plan: &ScopePlan, result: &ScopeResult) -> String {
    let mut lines = vec![
        format!("# Scope: {}", plan.title),
        format!("Scope ID: {}", plan.scope_id),
        String::new(),
        format!("## Files ({})", result.files.len()),
    ];

    for path in result.files.iter().take(30) {
        let mut marker = String::new();
        if result.key_files.contains(path) {
            marker.push_str(" [KEY]");
        }
        if result.entrypoints.contains(path) {
            marker.push_str(" [ENTRY]");
        }
        lines.push(format!("  - {path}{marker}"));
    }
    if result.files.len() > 30 {
        lines.push(format!("  ... and {} more", result.files.len() - 30));
    }

    lines.push(String::new());
    let languages = if result.languages.is_empty() { "unknown".to_string() } else { result.languages.join(", ") };
    lines.push(format!("## Languages: {languages}"));

    if !result.public_api.is_empty() {
        lines.push(format!("\n## Public API ({} symbols)", result.public_api.len()));
        for sym in result.public_api.iter().take(25) {
            let sig = sym.signature.as_deref().unwrap_or("");
            let doc = sym.docstring.as_deref().map(|d| format!(" - {d}")).unwrap_or_default();
            lines.push(format!("  - {} `{}`: {}{}", sym.kind, sym.name, sig, doc));
        }
        if result.public_api.len() > 25 {
            lines.push(format!("  ... and {} more symbols", result.public_api.len() - 25));
        }
    }

    if !result.env_vars.is_empty() {
        lines.push(format!("\n## Environment Variables ({})", result.env_vars.len()));
        for ev in result.env_vars.iter().take(10) {
            let default = ev.default.as_deref().map(|d| format!(" (default: {d})")).unwrap_or_default();
            lines.push(format!("  - {}{}", ev.name, default));
        }
    }

    if !result.imports.is_empty() {
        lines.push(format!("\n## Key Imports ({})", result.imports.len()));
        for imp in result.imports.iter().take(15) {
            lines.push(format!("  - {imp}"));
        }
    }

    if let Some(rationale) = &plan.rationale {
        lines.push(format!("\n## Planner Notes\n{rationale}"));
    }

    lines.push("\n---".to_string());
    lines.push("Begin your analysis. Use tools to read files and record findings.".to_string());

    lines.join("\n")
}

/// Run one scope's top-level agent. Matches `scope_agent.py`'s tool
/// vocabulary: `FileAgent`'s `scope_tool_definitions` (read_file,
/// read_symbol, write_notepad, spawn_subagent, finish) — no folder
/// delegation at scope scope, only at the repo-wide root (see
/// [`root_delegate_discovery`]). Returns `result` unchanged if extraction
/// already failed or the agent produced nothing usable.
pub async fn enrich_scope_with_agent(
    ctx: &Arc<RunContext>,
    plan: &ScopePlan,
    mut result: ScopeResult,
    timeout: std::time::Duration,
) -> ScopeResult {
    if result.error.is_some() {
        return result;
    }

    let node_id = NodeId::root(&plan.scope_id);
    let context = build_scope_context(plan, &result);
    let known_symbols = Arc::new(result.public_api.clone());

    let outcome_fut = run_agent(
        ctx.clone(),
        AgentInput {
            node_id: node_id.clone(),
            parent_id: None,
            kind: NodeKind::FileAgent,
            depth: 0,
            purpose: "Produce thorough, accurate documentation for this scope: read the key files, \
                      spawn subagents for any file with more than ~100 lines or multiple \
                      functions/classes, and record findings on the notepad."
                .to_string(),
            target: context,
            parent_context_packet: String::new(),
            known_symbols,
        },
    );

    match tokio::time::timeout(timeout, outcome_fut).await {
        Ok(outcome) if !outcome.errored && !outcome.summary.trim().is_empty() => {
            result.summary = outcome.summary;
        }
        Ok(outcome) => {
            result.open_questions.push(format!("LLM summary generation failed: {}", outcome.summary));
        }
        Err(_) => {
            ctx.cancel_map.cancel(&node_id);
            result
                .open_questions
                .push(format!("LLM scope exploration timed out after {}s", timeout.as_secs()));
        }
    }

    result
}

/// One repo-wide pass with the `delegate_folder`-capable root agent, run
/// once per pipeline run independent of the deterministic planner. Its
/// discoveries supplement (never replace) the planner's scopes — the
/// caller merges `delegated_scopes` in, skipping any `scope_id` already
/// produced deterministically.
pub async fn root_delegate_discovery(ctx: &Arc<RunContext>, timeout: std::time::Duration) -> Vec<ScopeResult> {
    let node_id = NodeId::root("_root");

    let outcome_fut = run_agent(
        ctx.clone(),
        AgentInput {
            node_id: node_id.clone(),
            parent_id: None,
            kind: NodeKind::RootAgent,
            depth: 0,
            purpose: "Survey the repository top-down and delegate exploration of any major \
                      subdirectory that deserves its own documented scope, beyond the flat, \
                      deterministic top-level grouping already planned."
                .to_string(),
            target: ".".to_string(),
            parent_context_packet: String::new(),
            known_symbols: Arc::new(Vec::new()),
        },
    );

    match tokio::time::timeout(timeout, outcome_fut).await {
        Ok(outcome) => outcome.delegated_scopes,
        Err(_) => {
            ctx.cancel_map.cancel(&node_id);
            tracing::warn!("root delegate-discovery pass timed out");
            Vec::new()
        }
    }
}

fn scope_block(scopes: &[ScopeResult]) -> String {
    let mut out = String::new();
    for scope in scopes {
        out.push_str(&format!(
            "- {} ({}): {} file(s), {} line(s). {}\n",
            scope.title,
            scope.scope_id,
            scope.file_count,
            scope.loc_total,
            if scope.summary.is_empty() { "(no summary)" } else { scope.summary.trim() }
        ));
    }
    if out.is_empty() {
        out.push_str("(no scopes)\n");
    }
    out
}

fn arch_scope_block(scopes: &[ScopeResult]) -> String {
    let mut out = String::new();
    for scope in scopes {
        let apis: Vec<String> = scope.public_api.iter().take(8).map(|s| s.name.clone()).collect();
        out.push_str(&format!(
            "- {} ({}): languages={:?}, public_api=[{}], env_vars={}\n",
            scope.title,
            scope.scope_id,
            scope.languages,
            apis.join(", "),
            scope.env_vars.len()
        ));
    }
    if out.is_empty() {
        out.push_str("(no scopes)\n");
    }
    out
}

async fn ask(llm: &Arc<dyn LlmAdapter>, model: &str, system: &str, prompt: String) -> Option<String> {
    let req = ChatRequest {
        messages: vec![Message::system(system.to_string()), Message::user(prompt)],
        tools: Vec::new(),
        temperature: Some(0.3),
        max_tokens: None,
        json_mode: false,
        model: Some(model.to_string()),
    };
    match llm.chat(&req, &CancelToken::new()).await {
        Ok(resp) if !resp.content.trim().is_empty() => Some(resp.content),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "llm enrichment call failed");
            None
        }
    }
}

fn clean_mermaid(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.splitn(2, '\n').nth(1).unwrap_or(rest);
    }
    let text = text.trim().trim_end_matches("```").trim();
    if text.starts_with("graph") {
        Some(text.to_string())
    } else {
        None
    }
}

/// Populate `cross_scope_analysis` and `mermaid_graph` on an already
/// reduced [`DocsIndex`], running both LLM calls concurrently. Never
/// fails the run: either field is simply left empty on error, exactly as
/// `reduce_with_llm` treats a failed `_analysis_task`/`_mermaid_task`.
pub async fn enrich_index_with_llm(llm: &Arc<dyn LlmAdapter>, model: &str, index: &mut DocsIndex) {
    let languages = if index.languages.is_empty() { "software".to_string() } else { index.languages.join(", ") };
    let edges_block = if index.scope_edges.is_empty() {
        "(none detected)".to_string()
    } else {
        index.scope_edges.iter().map(|(a, b)| format!("{a} -> {b}")).collect::<Vec<_>>().join(", ")
    };
    let entrypoints_block = if index.entrypoints.is_empty() { "(none)".to_string() } else { index.entrypoints.join(", ") };

    let analysis_prompt = format!(
        "Based on the scope data below, write a high-level overview of how this {languages} program works.\n\n\
         Repository: {}\n\nScopes:\n{}\n\nDependency edges (scope -> scope):\n{edges_block}\n\n\
         Write a clear, readable overview using markdown formatting (headings, bullets, bold). \
         Structure it as:\n\n## What it does\n## How it works\n## Key components\n## Tech stack\n\n\
         Keep the total length under 300 words. No file paths or symbol names.",
        index.repo_path,
        scope_block(&index.scopes),
    );

    let mermaid_prompt = format!(
        "Create a clean, readable Mermaid SYSTEM ARCHITECTURE diagram for this {languages} repository. \
         Aim for 6-12 nodes max, minimize crossing arrows, label edges sparingly, use simple \
         alphanumeric IDs, and wrap all labels in double quotes.\n\n\
         Here is what the automated exploration discovered about each component:\n{}\n\n\
         Detected dependency edges between components:\n{edges_block}\n\nSystem entrypoints: {entrypoints_block}\n",
        arch_scope_block(&index.scopes),
    );

    let (analysis, mermaid_raw) = tokio::join!(
        ask(llm, model, ANALYSIS_SYSTEM, analysis_prompt),
        ask(llm, model, MERMAID_SYSTEM, mermaid_prompt),
    );

    if let Some(analysis) = analysis {
        index.cross_scope_analysis = analysis;
    }
    if let Some(mermaid) = mermaid_raw.and_then(|raw| clean_mermaid(&raw)) {
        index.mermaid_graph = mermaid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_types::model::{EnvVar, PublicSymbol};

    fn plan() -> ScopePlan {
        ScopePlan {
            scope_id: "core".into(),
            title: "Core".into(),
            paths: vec!["core/mod.py".into()],
            rationale: Some("entrypoint cluster".into()),
        }
    }

    fn result() -> ScopeResult {
        ScopeResult {
            scope_id: "core".into(),
            title: "Core".into(),
            summary: "template summary".into(),
            key_files: vec!["core/mod.py".into()],
            entrypoints: vec![],
            public_api: vec![PublicSymbol {
                name: "run".into(),
                kind: "function".into(),
                signature: Some("run()".into()),
                docstring: Some("entry point".into()),
                citation: docbot_types::model::Citation::new("core/mod.py", None, 1, 2).unwrap(),
            }],
            env_vars: vec![EnvVar {
                name: "CORE_DEBUG".into(),
                default: None,
                citation: docbot_types::model::Citation::new("core/mod.py", None, 1, 1).unwrap(),
            }],
            errors: vec![],
            imports: vec!["util".into()],
            languages: vec!["python".into()],
            open_questions: vec![],
            files: vec!["core/mod.py".into()],
            file_count: 1,
            loc_total: 42,
            error: None,
        }
    }

    #[test]
    fn scope_context_includes_key_markers_and_api() {
        let ctx = build_scope_context(&plan(), &result());
        assert!(ctx.contains("Scope: Core"));
        assert!(ctx.contains("[KEY]"));
        assert!(ctx.contains("run"));
        assert!(ctx.contains("entrypoint cluster"));
    }

    #[test]
    fn clean_mermaid_strips_fences() {
        let raw = "```mermaid\ngraph TD\n  a --> b\n```";
        assert_eq!(clean_mermaid(raw).unwrap(), "graph TD\n  a --> b");
    }

    #[test]
    fn clean_mermaid_rejects_non_graph_output() {
        assert!(clean_mermaid("I can't do that").is_none());
    }
}
