//! Stateless, sandboxed tool primitives shared by every agent role.
//!
//! This crate owns the closed [`command::ToolCommand`] vocabulary and the
//! pure filesystem operations behind it. It deliberately knows nothing
//! about notepads, trackers, or child-agent spawning — those are stateful
//! and live in the engine crate, which dispatches `ToolCommand::Delegate`
//! and friends itself after calling down into this crate for the
//! read-only ones.

pub mod command;
pub mod list_dir;
pub mod path_guard;
pub mod read_file;
pub mod read_symbol;

pub use command::{root_tool_definitions, scope_tool_definitions, ToolCommand};
pub use path_guard::validate_path;
