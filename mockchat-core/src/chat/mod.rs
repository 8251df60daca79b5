//! Chat state: conversations, messages and simulated replies

pub mod composer;
pub mod controller;
pub mod event;
pub mod model;
pub mod reply;

pub use composer::Composer;
pub use controller::ChatSessionController;
pub use event::ChatEvent;
pub use model::{
    Attachment, Author, Conversation, ConversationId, Message, MessageId, ReplyState,
};
pub use reply::{CannedResponder, ReplyRequest, Responder};
