use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    ai::{
        ChatRequest, ChatResponse, Completion, LlmClient, RateLimiter, Turn,
        prompts::{build_context_prompt, system_prompt},
    },
    error::ChatError,
};

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_HISTORY_TURNS: usize = 10;
pub const ANONYMOUS: &str = "anonymous";

/// Stateless apart from the rate limiter: validates, assembles the prompt and
/// forwards to the model.
pub struct ChatProxy {
    client: Arc<dyn LlmClient>,
    limiter: RateLimiter,
}

impl ChatProxy {
    pub fn new(client: Arc<dyn LlmClient>, limiter: RateLimiter) -> Self {
        Self { client, limiter }
    }

    /// Counts against `identity`'s window before anything else is checked.
    pub fn admit(&self, identity: &str) -> Result<(), ChatError> {
        if self.limiter.check(identity) {
            Ok(())
        } else {
            Err(ChatError::RateLimited {
                identity: identity.to_string(),
            })
        }
    }

    pub async fn handle(&self, identity: &str, req: ChatRequest) -> Result<ChatResponse, ChatError> {
        self.admit(identity)?;
        self.forward(req).await
    }

    /// Everything after the rate-limit check.
    pub async fn forward(&self, req: ChatRequest) -> Result<ChatResponse, ChatError> {
        validate_message(&req.message)?;
        let completion = build_completion(&req);

        match self.client.complete(&completion).await {
            Ok(res) => {
                info!(
                    feature = req.feature.as_str(),
                    input_tokens = res.usage.input_tokens,
                    output_tokens = res.usage.output_tokens,
                    "chat answered"
                );
                Ok(res)
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                Err(e)
            }
        }
    }
}

pub fn validate_message(message: &str) -> Result<(), ChatError> {
    if message.trim().is_empty() {
        return Err(ChatError::InvalidMessage);
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}

/// Context (if any) as a leading user turn, then at most the last ten
/// history turns, then the new message.
pub fn build_completion(req: &ChatRequest) -> Completion {
    let mut messages = Vec::new();

    if let Some(ctx) = &req.context {
        let prompt = build_context_prompt(ctx, req.feature);
        if !prompt.is_empty() {
            messages.push(Turn::user(format!("Context Information:\n{prompt}")));
        }
    }

    let skip = req.conversation_history.len().saturating_sub(MAX_HISTORY_TURNS);
    messages.extend(req.conversation_history.iter().skip(skip).cloned());
    messages.push(Turn::user(req.message.clone()));

    Completion {
        system: system_prompt(req.feature).to_string(),
        messages,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ai::Usage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every completion and answers with a canned reply or error.
    #[derive(Default)]
    pub struct FakeClient {
        pub calls: Mutex<Vec<Completion>>,
        pub fail_with: Option<u16>,
    }

    #[async_trait]
    impl LlmClient for FakeClient {
        async fn complete(&self, request: &Completion) -> Result<ChatResponse, ChatError> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(status) = self.fail_with {
                return Err(ChatError::Upstream {
                    status,
                    body: "secret upstream detail".into(),
                });
            }
            Ok(ChatResponse {
                message: format!("echo: {}", request.messages.last().unwrap().content),
                message_id: "msg_test".into(),
                usage: Usage {
                    input_tokens: 1,
                    output_tokens: 2,
                },
            })
        }
    }
}
