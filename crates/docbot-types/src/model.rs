use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A source-location reference, used to ground every fact the pipeline
/// emits back to the exact file (and optionally symbol/line range) it
/// came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub line_start: u32,
    pub line_end: u32,
}

impl Citation {
    pub fn new(
        file: impl Into<String>,
        symbol: Option<String>,
        line_start: u32,
        line_end: u32,
    ) -> Result<Self> {
        if line_start > line_end {
            return Err(Error::other(format!(
                "citation line_start ({line_start}) > line_end ({line_end})"
            )));
        }
        Ok(Self {
            file: file.into(),
            symbol,
            line_start,
            line_end,
        })
    }

    pub fn whole_file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            symbol: None,
            line_start: 0,
            line_end: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSymbol {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub citation: Citation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub citation: Citation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisedError {
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub citation: Citation,
}

/// The result of running one extractor over one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtraction {
    pub path: String,
    pub language: String,
    #[serde(default)]
    pub symbols: Vec<PublicSymbol>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    #[serde(default)]
    pub errors: Vec<RaisedError>,
    pub loc: u32,
}

/// A single file as seen by the scanner, before any extraction runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub language: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub is_entrypoint: bool,
}

/// One planned unit of work: a named group of paths the pipeline will
/// explore (and, for agent-backed scopes, hand to a root agent) together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePlan {
    pub scope_id: String,
    pub title: String,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// The merged findings for one scope, after extraction and (optionally)
/// agent exploration.
///
/// Invariant (spec §3): `error.is_some()` iff the stage failed for this
/// scope; every other field remains valid (possibly empty) either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeResult {
    pub scope_id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default)]
    pub entrypoints: Vec<String>,
    #[serde(default)]
    pub public_api: Vec<PublicSymbol>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    #[serde(default)]
    pub errors: Vec<RaisedError>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    pub file_count: u32,
    pub loc_total: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// A note written to the shared notepad (C1) by any agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub topic: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle states of one node in the agent tree (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Pending,
    Waiting,
    Running,
    Done,
    Error,
}

/// What kind of work a tracker node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    RootAgent,
    FileAgent,
    SymbolAgent,
    FolderDelegate,
}

/// Opaque, tree-shaped node identifier: `"<scope_id>.<n>.<m>..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn root(scope_id: &str) -> Self {
        Self(scope_id.to_string())
    }

    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}.{}", self.0, index))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    pub kind: NodeKind,
    pub target: String,
    pub state: AgentState,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

/// A guided walkthrough step, citing the file/symbol it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourStep {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub tour_id: String,
    pub title: String,
    pub description: String,
    pub steps: Vec<TourStep>,
}

/// The final, merged documentation index for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsIndex {
    pub repo_path: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub scopes: Vec<ScopeResult>,
    /// Directed, deduped `(from, to)` edges over `scope_id`s. No self-loops.
    #[serde(default)]
    pub scope_edges: Vec<(String, String)>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    #[serde(default)]
    pub public_api: Vec<PublicSymbol>,
    #[serde(default)]
    pub entrypoints: Vec<String>,
    #[serde(default)]
    pub mermaid_graph: String,
    #[serde(default)]
    pub cross_scope_analysis: String,
    #[serde(default)]
    pub tours: Vec<Tour>,
}

/// Tracks which scope currently owns each repo-relative path.
///
/// Invariant: a path appears in at most one scope's set at a time —
/// `assign_scope` evicts it from any other scope before inserting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    pub scopes: HashMap<String, HashSet<String>>,
}

impl ProjectState {
    pub fn assign_scope(&mut self, scope_id: &str, path: impl Into<String>) {
        let path = path.into();
        for (other_id, paths) in self.scopes.iter_mut() {
            if other_id != scope_id {
                paths.remove(&path);
            }
        }
        self.scopes
            .entry(scope_id.to_string())
            .or_default()
            .insert(path);
    }

    pub fn scope_of(&self, path: &str) -> Option<&str> {
        self.scopes
            .iter()
            .find(|(_, paths)| paths.contains(path))
            .map(|(id, _)| id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSummary {
    pub scope_id: String,
    pub title: String,
    pub file_count: u32,
    pub loc_total: u32,
    pub doc_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_files: u32,
    pub total_loc: u32,
    pub total_scopes: u32,
}

/// A saved point-in-time summary of a run's output, used for incremental
/// updates and `docbot diff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSnapshot {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub graph_digest: String,
    pub scopes: Vec<ScopeSummary>,
    pub stats: SnapshotStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDelta {
    pub added_edges: Vec<(String, String)>,
    pub removed_edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub file_count_delta: i64,
    pub loc_delta: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeModification {
    pub scope_id: String,
    #[serde(default)]
    pub added_files: Vec<String>,
    #[serde(default)]
    pub removed_files: Vec<String>,
    #[serde(default)]
    pub added_symbols: Vec<String>,
    #[serde(default)]
    pub removed_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    pub from_run_id: String,
    pub to_run_id: String,
    pub added_scopes: Vec<String>,
    pub removed_scopes: Vec<String>,
    pub modified_scopes: Vec<ScopeModification>,
    pub graph_delta: GraphDelta,
    pub stats_delta: StatsDelta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_rejects_inverted_range() {
        let err = Citation::new("a.py", None, 10, 5).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn project_state_reassigns_path_exclusively() {
        let mut state = ProjectState::default();
        state.assign_scope("scope-a", "src/lib.rs");
        state.assign_scope("scope-b", "src/lib.rs");
        assert!(!state.scopes["scope-a"].contains("src/lib.rs"));
        assert!(state.scopes["scope-b"].contains("src/lib.rs"));
        assert_eq!(state.scope_of("src/lib.rs"), Some("scope-b"));
    }

    #[test]
    fn node_id_child_appends_dotted_index() {
        let root = NodeId::root("scope-a");
        let child = root.child(2);
        assert_eq!(child.0, "scope-a.2");
    }
}
