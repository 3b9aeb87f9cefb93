pub mod explore;
pub mod scanner;

pub use explore::explore;
pub use scanner::{scan_repo, ScanResult};
