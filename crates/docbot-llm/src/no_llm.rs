//! Adapter used when `no_llm = true` (or no API key is configured).
//!
//! Every call fails immediately with a terminal [`Error::Llm`] so callers
//! never mistake "disabled" for "retryable" — the agent engine and scope
//! explorer both treat this adapter's errors as "fall back to the
//! deterministic path", never as something to retry.

use docbot_types::cancel::CancelToken;
use docbot_types::error::{Error, Result};
use docbot_types::stream::BoxStream;

use crate::traits::{ChatRequest, ChatResponse, LlmAdapter};

pub struct NoLlmAdapter;

#[async_trait::async_trait]
impl LlmAdapter for NoLlmAdapter {
    async fn chat(&self, _req: &ChatRequest, _cancel: &CancelToken) -> Result<ChatResponse> {
        Err(Error::Llm("no_llm mode: no adapter configured".into()))
    }

    async fn chat_stream(
        &self,
        _req: &ChatRequest,
        _cancel: &CancelToken,
    ) -> Result<BoxStream<'static, Result<docbot_types::stream::StreamEvent>>> {
        Err(Error::Llm("no_llm mode: no adapter configured".into()))
    }

    fn adapter_id(&self) -> &str {
        "no_llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chat_always_errors() {
        let adapter = NoLlmAdapter;
        let req = ChatRequest::default();
        let err = adapter.chat(&req, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}
