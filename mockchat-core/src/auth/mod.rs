//! Mock authentication
//!
//! Identities and the current session live in a [`KeyValueStore`] under
//! two keys. Secrets are compared in plaintext; nothing here is fit for
//! real credentials.
//!
//! [`KeyValueStore`]: crate::storage::KeyValueStore

pub mod gate;
pub mod model;
pub mod store;

pub use gate::{require_session, route, Route};
pub use model::{Identity, Session};
pub use store::SessionStore;
