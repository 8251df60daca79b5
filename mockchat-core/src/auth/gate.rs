//! Access gate between the login and chat views

use super::model::Session;
use super::store::SessionStore;

/// Which view the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Chat(Session),
}

/// Decide between the login and chat views
pub fn route(store: &SessionStore) -> Route {
    match store.current_session() {
        Some(session) => Route::Chat(session),
        None => Route::Login,
    }
}

/// The current session, or `Unauthorized` when signed out
pub fn require_session(store: &SessionStore) -> crate::Result<Session> {
    store
        .current_session()
        .ok_or_else(|| crate::Error::Unauthorized("sign in to continue".to_string()))
}
