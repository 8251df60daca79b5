//! Deferred assistant replies
//!
//! The controller hands each user message to a [`Responder`] on a spawned
//! task. [`CannedResponder`] waits a fixed delay and returns fixed text; a
//! real backend would implement the same trait.

use super::model::{ConversationId, Message};
use crate::config::ChatConfig;
use async_trait::async_trait;
use std::time::Duration;

/// What a responder is asked to answer
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub conversation_id: ConversationId,
    pub prompt: Message,
    /// Model label selected when the message was sent
    pub model: String,
}

/// Produces the body of an assistant reply
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: ReplyRequest) -> crate::Result<String>;
}

/// Replies with the same text after the same delay, every time
#[derive(Debug, Clone)]
pub struct CannedResponder {
    delay: Duration,
    text: String,
}

impl CannedResponder {
    pub fn new(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            delay,
            text: text.into(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.reply_delay(), config.canned_reply.clone())
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(&self, request: ReplyRequest) -> crate::Result<String> {
        tracing::debug!(
            conversation = %request.conversation_id,
            model = %request.model,
            "Scheduling canned reply in {:?}",
            self.delay
        );
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_canned_reply_waits_then_answers() {
        let responder = CannedResponder::new(Duration::from_millis(1500), "demo");
        let request = ReplyRequest {
            conversation_id: ConversationId::generate(),
            prompt: Message::user("hi", Vec::new()),
            model: "GPT-4".into(),
        };

        let start = tokio::time::Instant::now();
        let text = responder.respond(request).await.unwrap();
        assert_eq!(text, "demo");
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[test]
    fn test_from_config_uses_defaults() {
        let responder = CannedResponder::from_config(&ChatConfig::default());
        assert_eq!(responder.delay, Duration::from_millis(1500));
        assert!(responder.text.starts_with("I'm here to assist you!"));
    }
}
