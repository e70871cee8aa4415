//! OpenAIApiInvoker - [`AgentInvoker`] backed by the OpenAI Chat Completions API.
//!
//! Every call is stateless on the wire: the invoker reads the live
//! session's transcript from the [`TranscriptStore`] and replays it as
//! chat history after the rendered system prompt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use sparr_core::agent::{AgentInput, AgentInvoker, AgentReply, AgentRole};
use sparr_core::error::{AgentCallError, StorageError};
use sparr_core::memory::{ChatTurn, Speaker, TranscriptStore};

use crate::prompts::{PromptError, PromptRenderer, RenderedPrompt};
use crate::settings::InvokerSettings;

/// Agent invoker that talks to an OpenAI-compatible HTTP API.
pub struct OpenAIApiInvoker {
    client: Client,
    settings: InvokerSettings,
    prompts: PromptRenderer,
    transcripts: Arc<dyn TranscriptStore>,
}

impl OpenAIApiInvoker {
    /// Creates an invoker reading history from `transcripts`.
    pub fn new(
        settings: InvokerSettings,
        transcripts: Arc<dyn TranscriptStore>,
    ) -> Result<Self, PromptError> {
        Ok(Self {
            client: Client::new(),
            settings,
            prompts: PromptRenderer::new()?,
            transcripts,
        })
    }

    pub fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    async fn history(&self, memory_id: &str) -> Result<Vec<ChatTurn>, AgentCallError> {
        self.transcripts
            .read_all(memory_id)
            .await
            .map_err(|err: StorageError| {
                AgentCallError::Failed(format!("cannot read memory {memory_id}: {err}"))
            })
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, AgentCallError> {
        let response = self
            .client
            .post(self.settings.chat_completions_url())
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| AgentCallError::Failed(format!("OpenAI API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            AgentCallError::Malformed(format!("Failed to parse OpenAI response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl AgentInvoker for OpenAIApiInvoker {
    async fn invoke(
        &self,
        role: AgentRole,
        memory_id: &str,
        input: &AgentInput,
    ) -> Result<AgentReply, AgentCallError> {
        let prompt = self
            .prompts
            .render(input)
            .map_err(|err| AgentCallError::Failed(err.to_string()))?;
        let history = self.history(memory_id).await?;

        let request = ChatCompletionRequest {
            model: self.settings.model_for(role).to_string(),
            messages: build_messages(prompt, &history),
            max_tokens: self.settings.max_tokens,
        };
        tracing::debug!(
            target: "sparr::agent",
            %role,
            purpose = ?input.purpose,
            model = %request.model,
            history = history.len(),
            "Calling OpenAI API"
        );

        let text = self.send_request(&request).await?;
        Ok(AgentReply::new(text))
    }
}

/// System prompt, then the stored history, then the new user message.
fn build_messages(prompt: RenderedPrompt, history: &[ChatTurn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", prompt.system));
    messages.extend(history.iter().map(|turn| {
        let role = match turn.speaker {
            Speaker::User => "user",
            Speaker::Agent => "assistant",
        };
        ChatMessage::new(role, turn.text.clone())
    }));
    messages.push(ChatMessage::new("user", prompt.user));
    messages
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: String) -> Self {
        Self { role, content }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, AgentCallError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            AgentCallError::Malformed("OpenAI API returned no content in the response".into())
        })
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> AgentCallError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    let hint = match (is_retryable, retry_after) {
        (true, Some(delay)) => format!(", retry after {}s", delay.as_secs()),
        (true, None) => ", retry later".to_string(),
        (false, _) => String::new(),
    };
    AgentCallError::Failed(format!(
        "OpenAI API returned {}{}: {}",
        status.as_u16(),
        hint,
        message
    ))
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date values are not supported
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
