pub mod no_llm;
pub mod openai_compat;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

pub use no_llm::NoLlmAdapter;
pub use openai_compat::OpenAiCompatAdapter;
pub use traits::{ChatRequest, ChatResponse, LlmAdapter};
pub use util::{resolve_api_key, LLM_KEY_ENV};
