//! The recursive agent engine and its shared, run-scoped collaborators:
//! the notepad (C1), the event tracker (C2), the event bus (C3), and
//! cooperative cancellation (C2/§5). `engine::run_agent` is the ReAct
//! loop that ties all of them to an [`docbot_llm::LlmAdapter`] and the
//! [`docbot_toolkit`] tool vocabulary.

pub mod bus;
pub mod cancel;
pub mod engine;
pub mod notepad;
pub mod tracker;

pub use bus::EventBus;
pub use cancel::CancelMap;
pub use engine::{run_agent, AgentInput, AgentOutcome};
pub use notepad::Notepad;
pub use tracker::{Tracker, TrackerEvent, TrackerEventKind};

pub use docbot_types::cancel::CancelToken;
