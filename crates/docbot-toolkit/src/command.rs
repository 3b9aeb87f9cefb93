//! The closed set of tool commands an agent can invoke.
//!
//! Rather than dispatching on a tool name string all the way down, a parsed
//! [`ToolCall`](docbot_types::tool::ToolCall) is reified into a `ToolCommand`
//! once, near the parser. Everything downstream (the engine's dispatcher,
//! the tracker, the notepad) matches on this enum instead of re-parsing
//! `serde_json::Value` arguments at every call site.

use docbot_types::tool::{ToolCall, ToolDefinition};
use serde::Deserialize;
use serde_json::json;

/// A single parsed, typed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    ReadFile { path: String },
    ReadSymbol { file: String, name: String },
    ListDirectory { path: String },
    WriteNotepad { key: String, content: String },
    Delegate { agent_type: String, file: String, reason: Option<String> },
    DelegateFolder { folder: String, reason: Option<String> },
    Finish { summary: String },
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ReadSymbolArgs {
    file: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default = "default_path")]
    path: String,
}

fn default_path() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
struct WriteNotepadArgs {
    key: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DelegateArgs {
    agent_type: String,
    file: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DelegateFolderArgs {
    folder: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinishArgs {
    #[serde(default)]
    summary: String,
}

impl ToolCommand {
    /// Reify a raw [`ToolCall`] into a typed command.
    ///
    /// Unknown tool names or malformed argument objects are reported as
    /// `Err` so the caller can feed the message straight back to the model
    /// as a tool-result error, the same way a missing file does.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, String> {
        match call.tool_name.as_str() {
            "read_file" => {
                let args: ReadFileArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid read_file arguments: {e}"))?;
                Ok(ToolCommand::ReadFile { path: args.path })
            }
            "read_symbol" => {
                let args: ReadSymbolArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid read_symbol arguments: {e}"))?;
                Ok(ToolCommand::ReadSymbol { file: args.file, name: args.name })
            }
            "list_directory" => {
                let args: ListDirectoryArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid list_directory arguments: {e}"))?;
                Ok(ToolCommand::ListDirectory { path: args.path })
            }
            "write_notepad" => {
                let args: WriteNotepadArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid write_notepad arguments: {e}"))?;
                Ok(ToolCommand::WriteNotepad { key: args.key, content: args.content })
            }
            "spawn_subagent" => {
                let args: DelegateArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid spawn_subagent arguments: {e}"))?;
                Ok(ToolCommand::Delegate {
                    agent_type: args.agent_type,
                    file: args.file,
                    reason: args.reason,
                })
            }
            "delegate_folder" => {
                let args: DelegateFolderArgs = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| format!("Error: invalid delegate_folder arguments: {e}"))?;
                Ok(ToolCommand::DelegateFolder { folder: args.folder, reason: args.reason })
            }
            "finish" => {
                let args: FinishArgs = serde_json::from_value(call.arguments.clone())
                    .unwrap_or(FinishArgs { summary: String::new() });
                Ok(ToolCommand::Finish { summary: args.summary })
            }
            other => Err(format!("Error: unknown tool '{other}'")),
        }
    }

    /// True for the two delegation commands, which the engine schedules
    /// eagerly in the background rather than waiting on inline.
    pub fn is_spawn(&self) -> bool {
        matches!(self, ToolCommand::Delegate { .. } | ToolCommand::DelegateFolder { .. })
    }
}

/// Tool definitions offered to a scope-level or file/symbol-level agent.
pub fn scope_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        read_file_def(),
        read_symbol_def(),
        write_notepad_def(),
        spawn_subagent_def(),
        finish_def(),
    ]
}

/// Tool definitions offered to the root orchestration agent.
pub fn root_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        list_directory_def(),
        delegate_folder_def(),
        read_file_def(),
        write_notepad_def(),
        finish_def(),
    ]
}

fn read_file_def() -> ToolDefinition {
    ToolDefinition {
        name: "read_file".into(),
        description: "Read the contents of a file within the current scope.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the repo root." }
            },
            "required": ["path"]
        }),
    }
}

fn read_symbol_def() -> ToolDefinition {
    ToolDefinition {
        name: "read_symbol".into(),
        description: "Read just the source lines backing one public symbol.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "file": { "type": "string" },
                "name": { "type": "string" }
            },
            "required": ["file", "name"]
        }),
    }
}

fn write_notepad_def() -> ToolDefinition {
    ToolDefinition {
        name: "write_notepad".into(),
        description: "Record a finding on the shared notepad under a topic key.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "key": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["key", "content"]
        }),
    }
}

fn spawn_subagent_def() -> ToolDefinition {
    ToolDefinition {
        name: "spawn_subagent".into(),
        description: "Delegate deeper investigation of one file or symbol to a child agent.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "agent_type": { "type": "string", "enum": ["file", "symbol"] },
                "file": { "type": "string" },
                "reason": { "type": "string" }
            },
            "required": ["agent_type", "file"]
        }),
    }
}

fn delegate_folder_def() -> ToolDefinition {
    ToolDefinition {
        name: "delegate_folder".into(),
        description: "Delegate exploration of an entire subdirectory as its own scope.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "folder": { "type": "string" },
                "reason": { "type": "string" }
            },
            "required": ["folder"]
        }),
    }
}

fn list_directory_def() -> ToolDefinition {
    ToolDefinition {
        name: "list_directory".into(),
        description: "List the files and subdirectories at a path.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "default": "." }
            }
        }),
    }
}

fn finish_def() -> ToolDefinition {
    ToolDefinition {
        name: "finish".into(),
        description: "Signal that this agent is done and return a summary.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" }
            },
            "required": ["summary"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall { call_id: "c1".into(), tool_name: name.into(), arguments: args }
    }

    #[test]
    fn parses_read_file() {
        let cmd = ToolCommand::from_tool_call(&call("read_file", json!({"path": "src/lib.rs"}))).unwrap();
        assert_eq!(cmd, ToolCommand::ReadFile { path: "src/lib.rs".into() });
    }

    #[test]
    fn parses_delegate_and_flags_as_spawn() {
        let cmd = ToolCommand::from_tool_call(&call(
            "spawn_subagent",
            json!({"agent_type": "file", "file": "a.py"}),
        ))
        .unwrap();
        assert!(cmd.is_spawn());
    }

    #[test]
    fn unknown_tool_errors() {
        let err = ToolCommand::from_tool_call(&call("delete_repo", json!({}))).unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[test]
    fn finish_defaults_empty_summary() {
        let cmd = ToolCommand::from_tool_call(&call("finish", json!({}))).unwrap();
        assert_eq!(cmd, ToolCommand::Finish { summary: String::new() });
    }
}
