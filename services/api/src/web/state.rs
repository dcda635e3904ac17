//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use emotionverse_core::{
    conversation::ConversationController,
    domain::Conversation,
    identity::{IdentityService, IdentityWatch},
    ports::AuthStore,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthStore>,
    pub identity: Arc<IdentityService>,
    pub conversations: Arc<ConversationController>,
}

//=========================================================================================
// ChatSession (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct ChatSession {
    /// The auth cookie the connection was opened with, if any.
    pub auth_session_id: Option<String>,
    pub identity: IdentityWatch,
    /// The chat currently on screen. Rebuilt from the store on every open.
    pub open_chat: Option<Conversation>,
}

impl ChatSession {
    pub fn new(auth_session_id: Option<String>) -> Self {
        Self {
            auth_session_id,
            identity: IdentityWatch::new(),
            open_chat: None,
        }
    }

    /// Resolves the identity from the auth cookie. Anything short of a valid
    /// session counts as signed out.
    pub async fn resolve_identity(&self, app_state: &AppState) {
        let user = match &self.auth_session_id {
            Some(id) => app_state.auth.validate_auth_session(id).await.ok(),
            None => None,
        };
        self.identity.resolve(user);
    }
}
