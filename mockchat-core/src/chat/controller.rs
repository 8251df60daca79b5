//! Chat session controller
//!
//! Owns the ordered conversation list (newest first by creation) and each
//! conversation's message log. Sending a message appends it immediately and
//! schedules one deferred assistant reply on a spawned task. Replies race a
//! per-conversation cancellation token: deleting the conversation,
//! [`ChatSessionController::cancel_pending`] or dropping the controller
//! discards them without recreating anything.

use super::composer::Composer;
use super::event::ChatEvent;
use super::model::{
    Attachment, Author, Conversation, ConversationId, Message, MessageId, ReplyState,
};
use super::reply::{CannedResponder, ReplyRequest, Responder};
use crate::config::ChatConfig;
use crate::utils::{single_line, truncate};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

struct ConversationEntry {
    summary: Conversation,
    messages: Vec<Message>,
    pending_replies: usize,
    /// Title is still the placeholder and may be derived from a message
    auto_title: bool,
    cancel: CancellationToken,
}

impl ConversationEntry {
    fn new(title: &str) -> Self {
        Self {
            summary: Conversation::new(title),
            messages: Vec::new(),
            pending_replies: 0,
            auto_title: true,
            cancel: CancellationToken::new(),
        }
    }

    fn reply_state(&self) -> ReplyState {
        if self.pending_replies > 0 {
            ReplyState::AwaitingReply
        } else {
            ReplyState::Idle
        }
    }

    fn append(&mut self, message: Message, config: &ChatConfig) {
        if self.auto_title && message.author == Author::User {
            let title = single_line(&message.body);
            if !title.is_empty() {
                self.summary.title = truncate(&title, config.title_len);
                self.auto_title = false;
            }
        }
        self.summary.last_message_preview = truncate(&message.preview(), config.preview_len);
        self.summary.updated_at = message.created_at;
        self.messages.push(message);
    }
}

struct ChatState {
    conversations: Vec<ConversationEntry>,
    current: Option<ConversationId>,
    selected_model: String,
}

impl ChatState {
    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.conversations.iter().position(|e| &e.summary.id == id)
    }

    fn entry(&self, id: &ConversationId) -> Option<&ConversationEntry> {
        self.conversations.iter().find(|e| &e.summary.id == id)
    }

    fn entry_mut(&mut self, id: &ConversationId) -> Option<&mut ConversationEntry> {
        self.conversations.iter_mut().find(|e| &e.summary.id == id)
    }
}

struct Shared {
    state: Mutex<ChatState>,
    config: ChatConfig,
    events: broadcast::Sender<ChatEvent>,
}

impl Shared {
    fn emit(&self, event: ChatEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Conversation list, message logs and deferred replies for one signed-in user
pub struct ChatSessionController {
    shared: Arc<Shared>,
    responder: Arc<dyn Responder>,
}

impl ChatSessionController {
    /// Create an empty controller that asks `responder` for replies
    pub fn new(config: ChatConfig, responder: Arc<dyn Responder>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = ChatState {
            conversations: Vec::new(),
            current: None,
            selected_model: config.default_model.clone(),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                config,
                events,
            }),
            responder,
        }
    }

    /// Create a controller that answers with the configured canned reply
    pub fn with_canned_replies(config: ChatConfig) -> Self {
        let responder = Arc::new(CannedResponder::from_config(&config));
        Self::new(config, responder)
    }

    /// Receive events for every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events.subscribe()
    }

    /// Insert an empty conversation at the head and select it
    pub fn create_conversation(&self) -> ConversationId {
        let entry = ConversationEntry::new(&self.shared.config.placeholder_title);
        let id = entry.summary.id.clone();

        let mut state = self.shared.state.lock();
        state.conversations.insert(0, entry);
        state.current = Some(id.clone());
        drop(state);

        debug!("Created conversation {}", id);
        self.shared.emit(ChatEvent::ConversationCreated(id.clone()));
        self.shared.emit(ChatEvent::ConversationSelected(id.clone()));
        id
    }

    /// Remove a conversation. Unknown ids are ignored.
    ///
    /// Deleting the current conversation selects the first remaining one.
    pub fn delete_conversation(&self, id: &ConversationId) {
        let mut state = self.shared.state.lock();
        let Some(index) = state.position(id) else {
            debug!("Delete ignored, no conversation {}", id);
            return;
        };

        let entry = state.conversations.remove(index);
        entry.cancel.cancel();
        self.shared.emit(ChatEvent::ConversationDeleted(id.clone()));
        debug!("Deleted conversation {}", id);

        if state.current.as_ref() == Some(id) {
            state.current = state.conversations.first().map(|e| e.summary.id.clone());
            if let Some(next) = &state.current {
                self.shared.emit(ChatEvent::ConversationSelected(next.clone()));
            }
        }
    }

    /// Make `id` the current conversation
    pub fn select_conversation(&self, id: &ConversationId) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.position(id).is_none() {
            return Err(Error::NotFound(format!("conversation {}", id)));
        }
        state.current = Some(id.clone());
        self.shared.emit(ChatEvent::ConversationSelected(id.clone()));
        Ok(())
    }

    /// Append a user message to the current conversation and schedule a reply
    ///
    /// Returns the user message id immediately. Must be called from within a
    /// tokio runtime.
    pub fn send_message(
        &self,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<MessageId> {
        let text = text.into();
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Internal("no async runtime to schedule the reply".to_string()))?;

        let (request, token) = {
            let mut state = self.shared.state.lock();
            let model = state.selected_model.clone();
            let conversation_id = state
                .current
                .clone()
                .ok_or_else(|| Error::NotFound("no conversation selected".to_string()))?;
            let entry = state
                .entry_mut(&conversation_id)
                .ok_or_else(|| Error::NotFound(format!("conversation {}", conversation_id)))?;

            let message = Message::user(text, attachments);
            entry.append(message.clone(), &self.shared.config);
            entry.pending_replies += 1;
            let became_busy = entry.pending_replies == 1;

            self.shared.emit(ChatEvent::MessageAppended {
                conversation_id: conversation_id.clone(),
                message_id: message.id.clone(),
                author: Author::User,
            });
            if became_busy {
                self.shared.emit(ChatEvent::ReplyStateChanged {
                    conversation_id: conversation_id.clone(),
                    state: ReplyState::AwaitingReply,
                });
            }

            let request = ReplyRequest {
                conversation_id,
                prompt: message,
                model,
            };
            (request, entry.cancel.clone())
        };

        let message_id = request.prompt.id.clone();
        info!(
            conversation = %request.conversation_id,
            message = %message_id,
            "User message appended"
        );
        runtime.spawn(deliver_reply(
            Arc::clone(&self.shared),
            Arc::clone(&self.responder),
            request,
            token,
        ));
        Ok(message_id)
    }

    /// Send the composer's contents; the composer is cleared only on success
    pub fn send_draft(&self, composer: &mut Composer) -> Result<MessageId> {
        let id = self.send_message(composer.text(), composer.attachments().to_vec())?;
        composer.clear();
        Ok(id)
    }

    /// Discard every scheduled reply. Later sends schedule normally.
    pub fn cancel_pending(&self) {
        let mut state = self.shared.state.lock();
        for entry in &mut state.conversations {
            entry.cancel.cancel();
            entry.cancel = CancellationToken::new();
        }
    }

    /// Conversation summaries in display order
    pub fn conversations(&self) -> Vec<Conversation> {
        self.shared
            .state
            .lock()
            .conversations
            .iter()
            .map(|e| e.summary.clone())
            .collect()
    }

    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.shared.state.lock().current.clone()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        let state = self.shared.state.lock();
        let id = state.current.as_ref()?;
        state.entry(id).map(|e| e.summary.clone())
    }

    /// Messages of a conversation, oldest first
    pub fn messages(&self, id: &ConversationId) -> Option<Vec<Message>> {
        self.shared
            .state
            .lock()
            .entry(id)
            .map(|e| e.messages.clone())
    }

    pub fn reply_state(&self, id: &ConversationId) -> Option<ReplyState> {
        self.shared.state.lock().entry(id).map(|e| e.reply_state())
    }

    pub fn available_models(&self) -> &[String] {
        &self.shared.config.models
    }

    pub fn selected_model(&self) -> String {
        self.shared.state.lock().selected_model.clone()
    }

    /// Choose the model label passed along with future replies
    pub fn select_model(&self, name: &str) -> Result<()> {
        if !self.shared.config.models.iter().any(|m| m == name) {
            return Err(Error::NotFound(format!("model '{}'", name)));
        }
        self.shared.state.lock().selected_model = name.to_string();
        Ok(())
    }
}

impl Drop for ChatSessionController {
    fn drop(&mut self) {
        for entry in &self.shared.state.lock().conversations {
            entry.cancel.cancel();
        }
    }
}

async fn deliver_reply(
    shared: Arc<Shared>,
    responder: Arc<dyn Responder>,
    request: ReplyRequest,
    token: CancellationToken,
) {
    let conversation_id = request.conversation_id.clone();
    let outcome = tokio::select! {
        _ = token.cancelled() => None,
        result = responder.respond(request) => Some(result),
    };

    let mut state = shared.state.lock();
    let Some(entry) = state.entry_mut(&conversation_id) else {
        debug!("Dropping reply for deleted conversation {}", conversation_id);
        shared.emit(ChatEvent::ReplyDropped(conversation_id));
        return;
    };
    entry.pending_replies = entry.pending_replies.saturating_sub(1);

    match outcome {
        Some(Ok(body)) => {
            let message = Message::assistant(body);
            let message_id = message.id.clone();
            entry.append(message, &shared.config);
            shared.emit(ChatEvent::MessageAppended {
                conversation_id: conversation_id.clone(),
                message_id,
                author: Author::Assistant,
            });
        }
        Some(Err(e)) => {
            warn!("Reply for conversation {} failed: {}", conversation_id, e);
            shared.emit(ChatEvent::ReplyFailed {
                conversation_id: conversation_id.clone(),
                reason: e.to_string(),
            });
        }
        None => {
            debug!("Reply for conversation {} cancelled", conversation_id);
            shared.emit(ChatEvent::ReplyDropped(conversation_id.clone()));
        }
    }

    if entry.pending_replies == 0 {
        shared.emit(ChatEvent::ReplyStateChanged {
            conversation_id,
            state: ReplyState::Idle,
        });
    }
}
