//! The deterministic scan -> plan -> extract -> reduce -> render pipeline
//! (`C11`), plus the optional LLM-backed enrichment layered on top of it
//! and the run coordinator that ties both together (`C9`).

pub mod llm_enrich;
pub mod orchestrator;
pub mod plan;
pub mod reduce;
pub mod render;
pub mod scan;

pub use orchestrator::{run_pipeline, PipelineOptions, PipelineOutcome, RunMode};
