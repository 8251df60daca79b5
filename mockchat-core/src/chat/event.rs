//! Events published by the chat controller

use super::model::{Author, ConversationId, MessageId, ReplyState};

/// Something the presentation layer may want to redraw for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    ConversationCreated(ConversationId),
    ConversationSelected(ConversationId),
    ConversationDeleted(ConversationId),
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
        author: Author,
    },
    ReplyStateChanged {
        conversation_id: ConversationId,
        state: ReplyState,
    },
    /// A scheduled reply was discarded (conversation deleted or replies cancelled)
    ReplyDropped(ConversationId),
    /// The responder returned an error; nothing was appended
    ReplyFailed {
        conversation_id: ConversationId,
        reason: String,
    },
}
