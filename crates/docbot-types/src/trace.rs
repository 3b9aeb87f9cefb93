use serde::Serialize;

/// Structured trace events emitted across all docbot crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ScopePlanned {
        scope_id: String,
        title: String,
        file_count: usize,
    },
    ScopeExplored {
        scope_id: String,
        file_count: u32,
        loc_total: u32,
        had_error: bool,
    },
    AgentSpawned {
        node_id: String,
        kind: String,
        depth: u32,
        parent_id: Option<String>,
    },
    AgentFinished {
        node_id: String,
        state: String,
        duration_ms: u64,
    },
    LlmRequest {
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ToolInvoked {
        node_id: String,
        tool_name: String,
        duration_ms: u64,
        is_error: bool,
    },
    SnapshotSaved {
        run_id: String,
        scope_count: usize,
    },
    RunCompleted {
        run_id: String,
        duration_ms: u64,
        scope_count: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "docbot_event");
    }
}
