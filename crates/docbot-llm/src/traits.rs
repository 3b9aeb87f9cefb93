use docbot_types::cancel::CancelToken;
use docbot_types::error::Result;
use docbot_types::stream::{BoxStream, StreamEvent, Usage};
use docbot_types::tool::{Message, ToolCall, ToolDefinition};

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
    pub model: Option<String>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Trait every LLM transport implements: one non-streaming call, one
/// streaming call. Implementations own their own concurrency limit and
/// must honor `cancel` cooperatively — check it before issuing the request
/// and, for streams, between chunks.
#[async_trait::async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn chat(&self, req: &ChatRequest, cancel: &CancelToken) -> Result<ChatResponse>;

    async fn chat_stream(
        &self,
        req: &ChatRequest,
        cancel: &CancelToken,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// A unique identifier for this adapter instance, used in logs and traces.
    fn adapter_id(&self) -> &str;
}
