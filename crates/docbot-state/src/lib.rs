//! Persistence for the `.docbot/` directory: which scope owns each path,
//! snapshot history across runs, and diffing between snapshots.

pub mod diff;
pub mod history;
pub mod project_state;

pub use diff::{compute_detailed_scope_diff, compute_diff};
pub use history::{load_scope_result, load_snapshot, list_snapshots, prune_snapshots, save_snapshot};
