//! Stage coordinator (`C9`): scan -> plan -> extract (+ optional agent
//! enrichment) -> reduce (+ optional LLM analysis) -> render, under a
//! run-scoped semaphore and per-scope timeout.
//!
//! Grounded on `original_source/orchestrator.py::run_async`'s five-stage
//! shape and its `_explore_one` partial-failure wrapper (timeout/panic ->
//! `ScopeResult { error: Some(..), .. }`, never aborting the run). Scope
//! exploration additionally runs one `FileAgent`-kind scope agent per
//! successfully extracted scope when an LLM adapter is configured
//! (`agents/scope_agent.py::run_scope_agent`), plus one repo-wide
//! `RootAgent`-kind discovery pass whose `delegate_folder` findings
//! supplement, never replace, the deterministic plan.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docbot_engine::engine::{RunContext, DEFAULT_MAX_STEPS};
use docbot_engine::{CancelMap, EventBus, Notepad, Tracker};
use docbot_extract::ExtractorRegistry;
use docbot_llm::LlmAdapter;
use docbot_types::config::Config;
use docbot_types::error::{Error, Result};
use docbot_types::model::{DocSnapshot, DocsIndex, ScopePlan, ScopeResult};
use docbot_types::trace::TraceEvent;
use tokio::sync::Semaphore;

use crate::llm_enrich::{enrich_index_with_llm, enrich_scope_with_agent, root_delegate_discovery};
use crate::{plan, reduce, render, scan};

/// `Generate` builds a fresh index from scratch. `Update` diffs against
/// the commit recorded by the previous run (when the repo is a git
/// worktree) and only recomputes scopes that own a changed path, carrying
/// every other scope over from the latest snapshot unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Generate,
    Update,
}

pub struct PipelineOptions {
    pub repo_root: PathBuf,
    pub docbot_dir: PathBuf,
    pub config: Config,
    pub llm: Option<Arc<dyn LlmAdapter>>,
    pub mode: RunMode,
}

pub struct PipelineOutcome {
    pub index: DocsIndex,
    pub run_id: String,
    pub snapshot: DocSnapshot,
    pub rendered_paths: Vec<PathBuf>,
}

/// `<ISO-ish timestamp>_<6 hex>`, matching
/// `original_source/orchestrator.py::_make_run_id`.
pub fn new_run_id() -> String {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..6];
    format!("{stamp}_{suffix}")
}

const LAST_COMMIT_FILE: &str = "last_commit.txt";

fn git_command(repo_root: &Path, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new("git").args(args).current_dir(repo_root).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn git_head(repo_root: &Path) -> Option<String> {
    git_command(repo_root, &["rev-parse", "HEAD"])
}

/// Repo-relative paths changed between `since_commit` and `HEAD`, or
/// `None` when git is unavailable or the commit is unreachable (caller
/// falls back to recomputing every scope), matching
/// `original_source/git/utils.py::get_changed_files`/`is_commit_reachable`.
fn git_changed_files(repo_root: &Path, since_commit: &str) -> Option<Vec<String>> {
    git_command(repo_root, &["cat-file", "-t", since_commit])?;
    let diff = git_command(repo_root, &["diff", "--name-only", &format!("{since_commit}..HEAD")])?;
    Some(diff.lines().filter(|l| !l.trim().is_empty()).map(|l| l.replace('\\', "/")).collect())
}

fn read_last_commit(docbot_dir: &Path) -> Option<String> {
    std::fs::read_to_string(docbot_dir.join(LAST_COMMIT_FILE)).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn write_last_commit(docbot_dir: &Path, commit: &str) {
    if std::fs::create_dir_all(docbot_dir).is_ok() {
        let _ = std::fs::write(docbot_dir.join(LAST_COMMIT_FILE), commit);
    }
}

fn scopes_touching(plans: &[ScopePlan], changed: &[String]) -> HashSet<String> {
    let changed: HashSet<&str> = changed.iter().map(|s| s.as_str()).collect();
    plans
        .iter()
        .filter(|p| p.paths.iter().any(|f| changed.contains(f.as_str())))
        .map(|p| p.scope_id.clone())
        .collect()
}

fn error_scope(plan: &ScopePlan, message: String) -> ScopeResult {
    ScopeResult {
        scope_id: plan.scope_id.clone(),
        title: plan.title.clone(),
        summary: String::new(),
        key_files: Vec::new(),
        entrypoints: Vec::new(),
        public_api: Vec::new(),
        env_vars: Vec::new(),
        errors: Vec::new(),
        imports: Vec::new(),
        languages: Vec::new(),
        open_questions: Vec::new(),
        files: plan.paths.clone(),
        file_count: 0,
        loc_total: 0,
        error: Some(message),
    }
}

/// Extraction + (optional) agent enrichment for one scope, under the
/// run's concurrency semaphore and timeout. Never returns `Err` — a
/// failure anywhere becomes `ScopeResult { error: Some(..), .. }`.
async fn process_scope(
    plan: ScopePlan,
    repo_root: PathBuf,
    registry: Arc<ExtractorRegistry>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    run_ctx: Option<Arc<RunContext>>,
) -> ScopeResult {
    let _permit = semaphore.acquire_owned().await.ok();

    let plan_for_explore = plan.clone();
    let repo_root2 = repo_root.clone();
    let registry2 = registry.clone();
    let explore_fut =
        tokio::task::spawn_blocking(move || docbot_explore::explore(&plan_for_explore, &repo_root2, &registry2));

    let explored = match tokio::time::timeout(timeout, explore_fut).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => error_scope(&plan, format!("scope exploration panicked: {join_err}")),
        Err(_) => error_scope(&plan, format!("timed out after {}s", timeout.as_secs())),
    };

    TraceEvent::ScopeExplored {
        scope_id: explored.scope_id.clone(),
        file_count: explored.file_count,
        loc_total: explored.loc_total,
        had_error: explored.error.is_some(),
    }
    .emit();

    match run_ctx {
        Some(ctx) if explored.error.is_none() => enrich_scope_with_agent(&ctx, &plan, explored, timeout).await,
        _ => explored,
    }
}

fn build_run_context(
    config: &Config,
    llm: Arc<dyn LlmAdapter>,
    registry: Arc<ExtractorRegistry>,
    repo_root: PathBuf,
    run_id: &str,
) -> Arc<RunContext> {
    let bus = Arc::new(EventBus::new());
    let tracker = Arc::new(Tracker::new());
    let notepad = Arc::new(Notepad::new());
    tracker.attach_bus(bus.clone());
    notepad.attach_bus(bus.clone());
    tracker.set_run_id(run_id);

    Arc::new(RunContext {
        tracker,
        bus,
        notepad,
        llm,
        cancel_map: Arc::new(CancelMap::new()),
        extractor_registry: registry,
        repo_root,
        model: config.model.clone(),
        max_steps: DEFAULT_MAX_STEPS,
        agent_max_depth: config.agent_max_depth,
        agent_max_parallel: config.agent_max_parallel,
        notepad_budget_chars: config.notepad_budget_chars,
    })
}

/// Export shape mandated by spec §4.2: a JSON-safe object carrying the
/// run id and total duration alongside the flat event log, not the log
/// alone.
#[derive(serde::Serialize)]
struct ExportedEvents<'a> {
    run_id: &'a str,
    total_duration_ms: u64,
    events: Vec<docbot_engine::tracker::TrackerEvent>,
}

fn export_tracker_events(docbot_dir: &Path, run_id: &str, total_duration_ms: u64, tracker: &Tracker) -> Result<()> {
    let dir = docbot_dir.join("history").join(run_id);
    std::fs::create_dir_all(&dir)?;
    let export = ExportedEvents { run_id, total_duration_ms, events: tracker.export_events() };
    let raw = serde_json::to_string_pretty(&export).map_err(Error::Json)?;
    let path = dir.join("pipeline_events.json");
    let tmp = dir.join("pipeline_events.json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// Persist the latest `DocsIndex` at `.docbot/docs_index.json` (the
/// stable filesystem contract of spec §6), atomically.
fn save_docs_index(docbot_dir: &Path, index: &DocsIndex) -> Result<()> {
    std::fs::create_dir_all(docbot_dir)?;
    let path = docbot_dir.join("docs_index.json");
    let tmp = docbot_dir.join("docs_index.json.tmp");
    let raw = serde_json::to_string_pretty(index).map_err(Error::Json)?;
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

pub async fn run_pipeline(opts: PipelineOptions) -> Result<PipelineOutcome> {
    let PipelineOptions { repo_root, docbot_dir, config, llm, mode } = opts;

    let run_id = new_run_id();
    let started = std::time::Instant::now();
    tracing::info!(run_id, mode = ?mode, "pipeline run starting");

    let scan_result = scan::scan(&repo_root)?;
    let mut plans = plan::build_plan(&scan_result, config.max_scopes);
    for p in &plans {
        TraceEvent::ScopePlanned { scope_id: p.scope_id.clone(), title: p.title.clone(), file_count: p.paths.len() }.emit();
    }

    let mut project_state = docbot_state::project_state::load(&docbot_dir).unwrap_or_default();

    let mut carried_over: Vec<ScopeResult> = Vec::new();
    if mode == RunMode::Update {
        if let Some(prev_commit) = read_last_commit(&docbot_dir) {
            match git_changed_files(&repo_root, &prev_commit) {
                Some(changed) => {
                    let touched = scopes_touching(&plans, &changed);
                    tracing::info!(total = plans.len(), touched = touched.len(), "update mode: limiting recomputation");
                    if let Some(latest) = docbot_state::history::list_snapshots(&docbot_dir).into_iter().next() {
                        for summary in &latest.scopes {
                            if !touched.contains(&summary.scope_id) {
                                if let Some(prev) = docbot_state::history::load_scope_result(&docbot_dir, &latest.run_id, &summary.scope_id)
                                {
                                    carried_over.push(prev);
                                }
                            }
                        }
                    }
                    plans.retain(|p| touched.contains(&p.scope_id));
                }
                None => tracing::info!("update mode: commit unreachable or git unavailable, recomputing every scope"),
            }
        } else {
            tracing::info!("update mode: no prior run recorded, recomputing every scope");
        }
    }

    let registry = Arc::new(ExtractorRegistry::load());
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    let run_ctx = llm.map(|adapter| build_run_context(&config, adapter, registry.clone(), repo_root.clone(), &run_id));

    let mut tasks = Vec::with_capacity(plans.len());
    for p in &plans {
        tasks.push(tokio::spawn(process_scope(
            p.clone(),
            repo_root.clone(),
            registry.clone(),
            semaphore.clone(),
            timeout,
            run_ctx.clone(),
        )));
    }

    let mut scope_results: Vec<ScopeResult> = carried_over;
    for task in tasks {
        match task.await {
            Ok(result) => scope_results.push(result),
            Err(e) => tracing::warn!(error = %e, "scope task panicked outside process_scope"),
        }
    }

    if let Some(ctx) = &run_ctx {
        let existing_ids: HashSet<String> = scope_results.iter().map(|s| s.scope_id.clone()).collect();
        let discovered = root_delegate_discovery(ctx, timeout * 2).await;
        for scope in discovered {
            if existing_ids.contains(&scope.scope_id) {
                tracing::debug!(scope_id = %scope.scope_id, "dropping root-discovered scope: collides with a planned scope_id");
            } else {
                scope_results.push(scope);
            }
        }
    }

    for scope in &scope_results {
        for path in &scope.files {
            project_state.assign_scope(&scope.scope_id, path.clone());
        }
    }
    docbot_state::project_state::save(&docbot_dir, &project_state)?;

    let mut index = reduce::reduce(scope_results, &repo_root.display().to_string(), &run_id);

    if let Some(ctx) = &run_ctx {
        enrich_index_with_llm(&ctx.llm, &ctx.model, &mut index).await;
    }

    let rendered_paths = render::render(&index, &docbot_dir)?;
    save_docs_index(&docbot_dir, &index)?;

    let snapshot = docbot_state::history::save_snapshot(&docbot_dir, &index)?;
    TraceEvent::SnapshotSaved { run_id: run_id.clone(), scope_count: index.scopes.len() }.emit();

    let removed = docbot_state::history::prune_snapshots(&docbot_dir, config.max_snapshots)?;
    if removed > 0 {
        tracing::info!(removed, "pruned old snapshots");
    }

    if let Some(ctx) = &run_ctx {
        let total_duration_ms = started.elapsed().as_millis() as u64;
        if let Err(e) = export_tracker_events(&docbot_dir, &run_id, total_duration_ms, &ctx.tracker) {
            tracing::warn!(error = %e, "failed to export pipeline events");
        }
    }

    if let Some(head) = git_head(&repo_root) {
        write_last_commit(&docbot_dir, &head);
    }

    TraceEvent::RunCompleted { run_id: run_id.clone(), duration_ms: started.elapsed().as_millis() as u64, scope_count: index.scopes.len() }
        .emit();

    Ok(PipelineOutcome { index, run_id, snapshot, rendered_paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_has_expected_shape() {
        let id = new_run_id();
        let mut parts = id.split('_');
        let stamp = parts.next().unwrap();
        let suffix = parts.next().unwrap();
        assert!(stamp.ends_with('Z'));
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn scopes_touching_matches_on_changed_paths() {
        let plans = vec![
            ScopePlan { scope_id: "api".into(), title: "api".into(), paths: vec!["api/a.py".into()], rationale: None },
            ScopePlan { scope_id: "util".into(), title: "util".into(), paths: vec!["util/b.py".into()], rationale: None },
        ];
        let changed = vec!["api/a.py".to_string()];
        let touched = scopes_touching(&plans, &changed);
        assert!(touched.contains("api"));
        assert!(!touched.contains("util"));
    }

    #[tokio::test]
    async fn generate_mode_runs_scan_plan_reduce_render_without_llm() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/main.py"), "def main():\n    pass\n").unwrap();

        let docbot_dir = dir.path().join(".docbot");
        let outcome = run_pipeline(PipelineOptions {
            repo_root: dir.path().to_path_buf(),
            docbot_dir: docbot_dir.clone(),
            config: Config::default(),
            llm: None,
            mode: RunMode::Generate,
        })
        .await
        .unwrap();

        assert!(!outcome.index.scopes.is_empty());
        assert!(docbot_dir.join("docs/index.md").exists());
        assert!(docbot_dir.join("project_state.json").exists());
    }
}
