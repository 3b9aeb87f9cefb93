//! The recursive agent engine (C8): a ReAct-style loop per agent node,
//! dispatching tool calls through [`docbot_toolkit`] and scheduling
//! delegation eagerly as background tasks.
//!
//! Grounded on the teacher's turn loop (`sa_gateway::runtime::turn`) and
//! its sub-agent dispatcher (`sa_gateway::runtime::agent::run_agent`):
//! build context once, loop calling the LLM, accumulate streamed text and
//! tool calls, dispatch non-spawn tools synchronously, `await` spawned
//! children before returning.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use docbot_extract::ExtractorRegistry;
use docbot_llm::{ChatRequest, LlmAdapter};
use docbot_types::cancel::CancelToken;
use docbot_types::model::{AgentState, NodeId, NodeKind, PublicSymbol, ScopePlan, ScopeResult};
use docbot_types::stream::StreamEvent;
use docbot_types::tool::{Message, ToolCall, ToolDefinition};
use futures_util::StreamExt;
use regex::Regex;
use tokio::sync::Semaphore;

use crate::bus::EventBus;
use crate::cancel::CancelMap;
use crate::notepad::Notepad;
use crate::tracker::Tracker;

/// Default step budget for one agent's LLM-call loop (spec.md §4.8).
pub const DEFAULT_MAX_STEPS: usize = 15;

/// Default concurrency cap on one agent's own spawned children.
pub const DEFAULT_MAX_PARALLEL_SUBAGENTS: usize = 8;

/// Shared, run-scoped collaborators every agent invocation needs. One
/// instance is built per pipeline run and handed down by `Arc` to every
/// node in the agent tree.
pub struct RunContext {
    pub tracker: Arc<Tracker>,
    pub bus: Arc<EventBus>,
    pub notepad: Arc<Notepad>,
    pub llm: Arc<dyn LlmAdapter>,
    pub cancel_map: Arc<CancelMap>,
    pub extractor_registry: Arc<ExtractorRegistry>,
    pub repo_root: PathBuf,
    pub model: String,
    pub max_steps: usize,
    pub agent_max_depth: u32,
    pub agent_max_parallel: usize,
    pub notepad_budget_chars: usize,
}

/// What one agent invocation is asked to do.
pub struct AgentInput {
    pub node_id: NodeId,
    pub parent_id: Option<NodeId>,
    pub kind: NodeKind,
    pub depth: u32,
    pub purpose: String,
    pub target: String,
    pub parent_context_packet: String,
    /// The scope's already-extracted public symbols, for `read_symbol`
    /// resolution. Shared unchanged by every agent in one scope's tree.
    pub known_symbols: Arc<Vec<PublicSymbol>>,
}

/// What one agent invocation produces.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    pub summary: String,
    pub errored: bool,
    /// New scopes carved out by `delegate_folder` calls anywhere in this
    /// agent's subtree, to be merged into the run's scope list by the
    /// pipeline reducer.
    pub delegated_scopes: Vec<ScopeResult>,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Run one agent to completion. Boxed because the ReAct loop recurses
/// into itself for delegated children.
pub fn run_agent(ctx: Arc<RunContext>, input: AgentInput) -> BoxFuture<'static, AgentOutcome> {
    Box::pin(run_agent_inner(ctx, input))
}

async fn run_agent_inner(ctx: Arc<RunContext>, input: AgentInput) -> AgentOutcome {
    let AgentInput { node_id, parent_id, kind, depth, purpose, target, parent_context_packet, known_symbols } = input;

    ctx.tracker.add_node(node_id.clone(), parent_id.clone(), kind, target.clone(), depth);
    ctx.tracker.set_state(&node_id, AgentState::Running);

    let cancel = ctx.cancel_map.register(node_id.clone());
    if let Some(parent) = &parent_id {
        ctx.cancel_map.add_to_group(parent, node_id.clone());
    }

    let tool_defs = tool_definitions_for(kind);
    let can_delegate_folder = matches!(kind, NodeKind::RootAgent);

    let system_prompt = build_system_prompt(&purpose, &target, &parent_context_packet, depth, ctx.agent_max_depth);
    let mut messages = vec![Message::system(system_prompt), Message::user(target.clone())];

    let spawn_semaphore = Arc::new(Semaphore::new(ctx.agent_max_parallel.max(1)));
    let mut pending_children: Vec<tokio::task::JoinHandle<ChildResult>> = Vec::new();
    let mut delegated_scopes: Vec<ScopeResult> = Vec::new();

    // Deterministic delegation plan: computed once, merged into the same
    // pending-children list the model's own delegate calls populate.
    if can_delegate_folder {
        for plan in deterministic_delegation_plan(&ctx, &target, depth) {
            spawn_delegate_folder(&ctx, &node_id, depth, plan, &spawn_semaphore, &mut pending_children);
        }
    }

    let outcome = agent_loop(
        &ctx,
        &node_id,
        depth,
        &cancel,
        &mut messages,
        &tool_defs,
        can_delegate_folder,
        &known_symbols,
        &spawn_semaphore,
        &mut pending_children,
        &mut delegated_scopes,
    )
    .await;

    // `finish` (or loop exhaustion) happens-after all transitive children
    // complete: await every spawned child before returning.
    for handle in pending_children {
        match handle.await {
            Ok(ChildResult::Scope(scope)) => delegated_scopes.push(scope),
            Ok(ChildResult::Agent { .. }) => {}
            Err(e) => tracing::warn!(error = %e, "child agent task panicked"),
        }
    }

    ctx.cancel_map.remove(&node_id);
    ctx.tracker.set_state(&node_id, if outcome.errored { AgentState::Error } else { AgentState::Done });
    ctx.tracker.set_summary(&node_id, outcome.summary.clone());

    AgentOutcome { delegated_scopes, ..outcome }
}

fn tool_definitions_for(kind: NodeKind) -> Vec<ToolDefinition> {
    match kind {
        NodeKind::RootAgent | NodeKind::FolderDelegate => docbot_toolkit::root_tool_definitions(),
        NodeKind::FileAgent | NodeKind::SymbolAgent => docbot_toolkit::scope_tool_definitions(),
    }
}

fn build_system_prompt(purpose: &str, target: &str, parent_context: &str, depth: u32, max_depth: u32) -> String {
    let budget_note = if depth >= max_depth {
        "You are at the maximum delegation depth: do not spawn further children.".to_string()
    } else {
        format!("You may delegate up to depth {max_depth} (currently at depth {depth}).")
    };
    let context_clause = if parent_context.is_empty() {
        String::new()
    } else {
        format!("\n\nContext from the parent agent:\n{parent_context}")
    };
    format!(
        "You are a documentation exploration agent. Purpose: {purpose}\nTarget: {target}\n{budget_note}\n\
         Use the available tools to investigate, record findings on the shared notepad under a clear topic, \
         and call `finish` with a concise summary once done.{context_clause}"
    )
}

#[allow(clippy::too_many_arguments)]
async fn agent_loop(
    ctx: &Arc<RunContext>,
    node_id: &NodeId,
    depth: u32,
    cancel: &CancelToken,
    messages: &mut Vec<Message>,
    tool_defs: &[ToolDefinition],
    can_delegate_folder: bool,
    known_symbols: &Arc<Vec<PublicSymbol>>,
    spawn_semaphore: &Arc<Semaphore>,
    pending_children: &mut Vec<tokio::task::JoinHandle<ChildResult>>,
    delegated_scopes: &mut Vec<ScopeResult>,
) -> AgentOutcome {
    let max_steps = ctx.max_steps;
    let mut retried = false;

    let mut step = 0;
    loop {
        if step >= max_steps {
            if !retried {
                retried = true;
                messages.push(Message::user(
                    "You have reached the step limit. Call `finish` now with your best summary of findings so far.",
                ));
                step = 0;
                continue;
            }
            return AgentOutcome {
                summary: "agent_error: max steps reached without a usable summary".to_string(),
                errored: true,
                delegated_scopes: std::mem::take(delegated_scopes),
            };
        }

        if cancel.is_cancelled() {
            return AgentOutcome {
                summary: "agent_error: cancelled".to_string(),
                errored: true,
                delegated_scopes: std::mem::take(delegated_scopes),
            };
        }

        step += 1;

        let req = ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.to_vec(),
            temperature: Some(0.2),
            max_tokens: None,
            json_mode: false,
            model: Some(ctx.model.clone()),
        };

        let stream = match ctx.llm.chat_stream(&req, cancel).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(node_id = %node_id.0, error = %e, "llm call failed");
                return AgentOutcome {
                    summary: format!("agent_error: llm call failed: {e}"),
                    errored: true,
                    delegated_scopes: std::mem::take(delegated_scopes),
                };
            }
        };

        let (text_buf, mut tool_calls, cancelled) = consume_stream(ctx, node_id, cancel, stream).await;

        if cancelled {
            return AgentOutcome {
                summary: "agent_error: cancelled mid-stream".to_string(),
                errored: true,
                delegated_scopes: std::mem::take(delegated_scopes),
            };
        }

        if tool_calls.is_empty() {
            if let Some(parsed) = parse_tool_calls_from_text(&text_buf) {
                tool_calls = parsed;
            }
        }

        if tool_calls.is_empty() {
            // No tool call at all: treat the model's text as its answer,
            // same as the teacher's "no pending_tool_calls" finalization.
            return AgentOutcome { summary: text_buf, errored: false, delegated_scopes: std::mem::take(delegated_scopes) };
        }

        messages.push(Message::assistant(text_buf));

        for call in &tool_calls {
            let parsed = match docbot_toolkit::ToolCommand::from_tool_call(call) {
                Ok(cmd) => cmd,
                Err(e) => {
                    messages.push(Message::tool_result(call.call_id.clone(), e));
                    continue;
                }
            };

            if let docbot_toolkit::ToolCommand::Finish { summary } = parsed {
                return AgentOutcome { summary, errored: false, delegated_scopes: std::mem::take(delegated_scopes) };
            }

            let started = std::time::Instant::now();

            if parsed.is_spawn() {
                let ack = dispatch_spawn(
                    ctx,
                    node_id,
                    depth,
                    can_delegate_folder,
                    parsed,
                    spawn_semaphore,
                    pending_children,
                );
                ctx.tracker.record_tool_call(node_id, &call.tool_name, started.elapsed().as_millis() as u64, false);
                messages.push(Message::tool_result(call.call_id.clone(), ack));
                continue;
            }

            let author = format!("{:?}:{}", 0, node_id.0);
            let result = dispatch_sync_tool(ctx, node_id, &author, known_symbols, parsed);
            let is_error = result.starts_with("Error");
            ctx.tracker.record_tool_call(node_id, &call.tool_name, started.elapsed().as_millis() as u64, is_error);
            messages.push(Message::tool_result(call.call_id.clone(), result));
        }
    }
}

enum ChildResult {
    Agent { summary: String, errored: bool },
    Scope(ScopeResult),
}

async fn consume_stream(
    ctx: &Arc<RunContext>,
    node_id: &NodeId,
    cancel: &CancelToken,
    mut stream: docbot_types::stream::BoxStream<'static, docbot_types::error::Result<StreamEvent>>,
) -> (String, Vec<ToolCall>, bool) {
    let mut text_buf = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut tc_bufs: HashMap<String, (String, String)> = HashMap::new();

    while let Some(event) = stream.next().await {
        if cancel.is_cancelled() {
            return (text_buf, tool_calls, true);
        }
        match event {
            Ok(StreamEvent::Token { text }) => {
                ctx.tracker.append_text(node_id, &text);
                text_buf.push_str(&text);
            }
            Ok(StreamEvent::ToolCallStarted { call_id, tool_name }) => {
                tc_bufs.insert(call_id, (tool_name, String::new()));
            }
            Ok(StreamEvent::ToolCallDelta { call_id, delta }) => {
                if let Some((_, args)) = tc_bufs.get_mut(&call_id) {
                    args.push_str(&delta);
                }
            }
            Ok(StreamEvent::ToolCallFinished { call_id, tool_name, arguments }) => {
                tool_calls.push(ToolCall { call_id: call_id.clone(), tool_name, arguments });
                tc_bufs.remove(&call_id);
            }
            Ok(StreamEvent::Done { .. }) => break,
            Ok(StreamEvent::Error { message }) => {
                tracing::warn!(node_id = %node_id.0, message, "stream error event");
                break;
            }
            Err(e) => {
                tracing::warn!(node_id = %node_id.0, error = %e, "stream transport error");
                break;
            }
        }
    }

    for (call_id, (tool_name, args_str)) in tc_bufs {
        let arguments = if args_str.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&args_str).unwrap_or(serde_json::Value::Object(Default::default()))
        };
        tool_calls.push(ToolCall { call_id, tool_name, arguments });
    }

    (text_buf, tool_calls, false)
}

/// Three-tier tool-call parsing fallback for providers that only return
/// plain text: native structured calls (handled in `consume_stream`) take
/// precedence over this, which tries a fenced `json` block first, then an
/// inline `{"tool": ..., "args": ...}` object anywhere in the text.
fn parse_tool_calls_from_text(text: &str) -> Option<Vec<ToolCall>> {
    parse_fenced_tool_call(text).or_else(|| parse_inline_tool_call(text)).map(|c| vec![c])
}

fn parse_fenced_tool_call(text: &str) -> Option<ToolCall> {
    let re = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok()?;
    let captures = re.captures(text)?;
    tool_call_from_json(captures.get(1)?.as_str())
}

fn parse_inline_tool_call(text: &str) -> Option<ToolCall> {
    let re = Regex::new(r#"\{[^{}]*"tool"\s*:\s*"[^"]+"[^{}]*\}"#).ok()?;
    let found = re.find(text)?;
    tool_call_from_json(found.as_str())
}

fn tool_call_from_json(raw: &str) -> Option<ToolCall> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let tool_name = value.get("tool")?.as_str()?.to_string();
    let arguments = value.get("args").cloned().unwrap_or_else(|| serde_json::json!({}));
    Some(ToolCall { call_id: format!("parsed-{}", uuid::Uuid::new_v4()), tool_name, arguments })
}

fn dispatch_sync_tool(
    ctx: &Arc<RunContext>,
    _node_id: &NodeId,
    author: &str,
    known_symbols: &Arc<Vec<PublicSymbol>>,
    cmd: docbot_toolkit::ToolCommand,
) -> String {
    use docbot_toolkit::ToolCommand;

    match cmd {
        ToolCommand::ReadFile { path } => match docbot_toolkit::validate_path(&ctx.repo_root, &path) {
            Ok(abs) => docbot_toolkit::read_file::read_file(&abs, &path).unwrap_or_else(|e| e),
            Err(e) => e,
        },
        ToolCommand::ReadSymbol { file, name } => match docbot_toolkit::validate_path(&ctx.repo_root, &file) {
            Ok(abs) => docbot_toolkit::read_symbol::read_symbol(&abs, &file, &name, known_symbols).unwrap_or_else(|e| e),
            Err(e) => e,
        },
        ToolCommand::ListDirectory { path } => match docbot_toolkit::validate_path(&ctx.repo_root, &path) {
            Ok(abs) => docbot_toolkit::list_dir::list_directory(&abs).unwrap_or_else(|e| e),
            Err(e) => e,
        },
        ToolCommand::WriteNotepad { key, content } => ctx.notepad.write(&key, &content, author),
        ToolCommand::Delegate { .. } | ToolCommand::DelegateFolder { .. } | ToolCommand::Finish { .. } => {
            unreachable!("spawn-type and finish commands are handled by the caller")
        }
    }
}

/// Schedule a spawn-type tool call as a background task under this
/// agent's own child-concurrency semaphore, and return the scheduling ack
/// handed back to the LLM. Does not count toward the step budget.
fn dispatch_spawn(
    ctx: &Arc<RunContext>,
    parent_id: &NodeId,
    depth: u32,
    can_delegate_folder: bool,
    cmd: docbot_toolkit::ToolCommand,
    semaphore: &Arc<Semaphore>,
    pending_children: &mut Vec<tokio::task::JoinHandle<ChildResult>>,
) -> String {
    use docbot_toolkit::ToolCommand;

    match cmd {
        ToolCommand::Delegate { agent_type, file, reason } => {
            if depth >= ctx.agent_max_depth {
                return format!("Error: delegation depth {} exceeds agent_max_depth", depth + 1);
            }
            let child_kind = if agent_type == "symbol" { NodeKind::SymbolAgent } else { NodeKind::FileAgent };
            let child_id = parent_id.child(pending_children.len());
            let ctx2 = ctx.clone();
            let parent_id2 = parent_id.clone();
            let sem2 = semaphore.clone();
            let target = file.clone();
            let known = Arc::new(Vec::new());
            let purpose = reason.unwrap_or_else(|| format!("investigate {file}"));
            let handle = tokio::spawn(async move {
                let _permit = sem2.acquire_owned().await.ok();
                let outcome = run_agent(
                    ctx2,
                    AgentInput {
                        node_id: child_id,
                        parent_id: Some(parent_id2),
                        kind: child_kind,
                        depth: depth + 1,
                        purpose,
                        target,
                        parent_context_packet: String::new(),
                        known_symbols: known,
                    },
                )
                .await;
                ChildResult::Agent { summary: outcome.summary, errored: outcome.errored }
            });
            pending_children.push(handle);
            format!("Scheduled {agent_type} agent for '{file}' (ack)")
        }
        ToolCommand::DelegateFolder { folder, reason } => {
            if !can_delegate_folder {
                return "Error: delegate_folder is only available to the root agent".to_string();
            }
            spawn_delegate_folder_cmd(ctx, parent_id, depth, folder, reason, semaphore, pending_children)
        }
        _ => unreachable!("only spawn-type commands reach dispatch_spawn"),
    }
}

fn spawn_delegate_folder_cmd(
    ctx: &Arc<RunContext>,
    parent_id: &NodeId,
    depth: u32,
    folder: String,
    reason: Option<String>,
    semaphore: &Arc<Semaphore>,
    pending_children: &mut Vec<tokio::task::JoinHandle<ChildResult>>,
) -> String {
    let scope_id = folder.trim_matches('/').replace('/', ".");
    let plan = ScopePlan {
        scope_id: scope_id.clone(),
        title: folder.clone(),
        paths: Vec::new(),
        rationale: reason,
    };
    spawn_delegate_folder(ctx, parent_id, depth, plan, semaphore, pending_children);
    format!("Scheduled folder scope '{folder}' (ack)")
}

/// Schedule one `delegate_folder`-shaped background task: scan the
/// subtree, run deterministic extraction, and register a `FolderDelegate`
/// tracker node. Used both by the model's own `delegate_folder` calls and
/// by the deterministic delegation plan.
fn spawn_delegate_folder(
    ctx: &Arc<RunContext>,
    parent_id: &NodeId,
    depth: u32,
    plan: ScopePlan,
    semaphore: &Arc<Semaphore>,
    pending_children: &mut Vec<tokio::task::JoinHandle<ChildResult>>,
) {
    let child_id = parent_id.child(pending_children.len());
    let ctx2 = ctx.clone();
    let parent_id2 = parent_id.clone();
    let sem2 = semaphore.clone();

    let handle = tokio::spawn(async move {
        let _permit = sem2.acquire_owned().await.ok();
        ctx2.tracker.add_node(child_id.clone(), Some(parent_id2), NodeKind::FolderDelegate, plan.title.clone(), depth + 1);
        ctx2.tracker.set_state(&child_id, AgentState::Running);

        let mut filled_plan = plan;
        if filled_plan.paths.is_empty() {
            filled_plan.paths = paths_under(&ctx2.repo_root, &filled_plan.title);
        }

        let repo_root = ctx2.repo_root.clone();
        let registry = ctx2.extractor_registry.clone();
        let plan_for_blocking = filled_plan.clone();
        let result = tokio::task::spawn_blocking(move || docbot_explore::explore(&plan_for_blocking, &repo_root, &registry))
            .await
            .unwrap_or_else(|e| ScopeResult {
                scope_id: filled_plan.scope_id.clone(),
                title: filled_plan.title.clone(),
                summary: String::new(),
                key_files: Vec::new(),
                entrypoints: Vec::new(),
                public_api: Vec::new(),
                env_vars: Vec::new(),
                errors: Vec::new(),
                imports: Vec::new(),
                languages: Vec::new(),
                open_questions: Vec::new(),
                files: Vec::new(),
                file_count: 0,
                loc_total: 0,
                error: Some(format!("folder delegate panicked: {e}")),
            });

        ctx2.tracker.set_state(&child_id, if result.error.is_some() { AgentState::Error } else { AgentState::Done });
        ctx2.tracker.set_summary(&child_id, result.summary.clone());
        ChildResult::Scope(result)
    });

    pending_children.push(handle);
}

fn paths_under(repo_root: &std::path::Path, folder: &str) -> Vec<String> {
    let abs = repo_root.join(folder);
    let Ok(scan) = docbot_explore::scan_repo(&abs) else {
        return Vec::new();
    };
    scan.source_files.into_iter().map(|f| format!("{folder}/{}", f.path)).collect()
}

/// Always enqueue up to 3 children over the top-level directories with
/// the most files, independent of what the model chooses to delegate
/// (spec.md §4.8, grounded in `original_source/explorer.py`'s
/// unconditional top-level fan-out). When `agent_max_depth >= 2` and the
/// repo has at least 80 scanned files, also plan 2 grandchildren per such
/// top-level directory.
fn deterministic_delegation_plan(ctx: &Arc<RunContext>, repo_relative_root: &str, depth: u32) -> Vec<ScopePlan> {
    let base = if repo_relative_root.is_empty() || repo_relative_root == "." {
        ctx.repo_root.clone()
    } else {
        ctx.repo_root.join(repo_relative_root)
    };

    let Ok(scan) = docbot_explore::scan_repo(&base) else {
        return Vec::new();
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for file in &scan.source_files {
        if let Some((top, _)) = file.path.split_once('/') {
            *counts.entry(top.to_string()).or_default() += 1;
        }
    }

    let mut top_dirs: Vec<(String, usize)> = counts.into_iter().collect();
    top_dirs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_dirs.truncate(3);

    let mut plans: Vec<ScopePlan> = top_dirs
        .iter()
        .map(|(dir, _)| ScopePlan {
            scope_id: dir.clone(),
            title: dir.clone(),
            paths: Vec::new(),
            rationale: Some("deterministic top-level fan-out".to_string()),
        })
        .collect();

    let total_files = scan.source_files.len();
    if depth == 0 && ctx.agent_max_depth >= 2 && total_files >= 80 {
        for (dir, _) in top_dirs.iter().take(3) {
            let sub_base = base.join(dir);
            if let Ok(sub_scan) = docbot_explore::scan_repo(&sub_base) {
                let mut sub_counts: HashMap<String, usize> = HashMap::new();
                for file in &sub_scan.source_files {
                    if let Some((sub, _)) = file.path.split_once('/') {
                        *sub_counts.entry(sub.to_string()).or_default() += 1;
                    }
                }
                let mut subs: Vec<(String, usize)> = sub_counts.into_iter().collect();
                subs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                for (sub, _) in subs.into_iter().take(2) {
                    plans.push(ScopePlan {
                        scope_id: format!("{dir}.{sub}"),
                        title: format!("{dir}/{sub}"),
                        paths: Vec::new(),
                        rationale: Some("deterministic grandchild fan-out".to_string()),
                    });
                }
            }
        }
    }

    plans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_tool_call_parses() {
        let text = "I will read the file.\n```json\n{\"tool\": \"read_file\", \"args\": {\"path\": \"a.py\"}}\n```\n";
        let calls = parse_tool_calls_from_text(text).unwrap();
        assert_eq!(calls[0].tool_name, "read_file");
        assert_eq!(calls[0].arguments["path"], "a.py");
    }

    #[test]
    fn inline_tool_call_parses_without_fences() {
        let text = "Calling now: {\"tool\": \"finish\", \"args\": {\"summary\": \"done\"}} thanks";
        let calls = parse_tool_calls_from_text(text).unwrap();
        assert_eq!(calls[0].tool_name, "finish");
        assert_eq!(calls[0].arguments["summary"], "done");
    }

    #[test]
    fn plain_text_has_no_tool_calls() {
        assert!(parse_tool_calls_from_text("just some prose, no tool call here").is_none());
    }

    #[test]
    fn system_prompt_forbids_delegation_past_max_depth() {
        let prompt = build_system_prompt("explore auth", "auth/", "", 2, 2);
        assert!(prompt.contains("maximum delegation depth"));
    }
}
