//! Shared utility functions for the LLM adapter.

use docbot_types::error::Error;

/// Convert a [`reqwest::Error`] into the shared [`Error`] type.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(120)
    } else {
        Error::Llm(e.to_string())
    }
}

/// Name of the environment variable holding the API key for the
/// reference OpenAI-compatible adapter.
pub const LLM_KEY_ENV: &str = "DOCBOT_LLM_KEY";

/// Resolve the API key from `DOCBOT_LLM_KEY`. Absence is not an error here —
/// callers decide whether to fall back to `no_llm` mode.
pub fn resolve_api_key() -> Option<String> {
    std::env::var(LLM_KEY_ENV).ok().filter(|s| !s.is_empty())
}
