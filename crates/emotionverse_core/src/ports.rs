//! crates/emotionverse_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the message store, the identity provider and the LLM API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Message, User, VerifiedIdentity};
use crate::persona::Persona;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Model Request / Response
//=========================================================================================

/// What the core asks the language model for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRequest {
    /// The persona prompt followed by the whole working conversation.
    Conversation {
        system_prompt: String,
        messages: Vec<Message>,
    },
    /// A single composed prompt embedding the persona and the latest user text.
    SingleShot { prompt: String },
}

/// The raw body returned by the model API. Interpreting it is the core's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub body: serde_json::Value,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The per-persona message log.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, persona: Persona, message: &Message) -> PortResult<()>;

    /// Returns every message for the persona, ascending by timestamp.
    async fn query(&self, persona: Persona) -> PortResult<Vec<Message>>;
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    // --- User Management ---
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Sends one request to the language model and returns its raw reply body.
    async fn complete(&self, request: &ModelRequest) -> PortResult<ModelResponse>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The provider's consent page the client should be redirected to.
    fn authorization_url(&self, state: &str) -> PortResult<String>;

    /// Trades the authorization code from the redirect for a verified identity.
    async fn exchange_code(&self, code: &str) -> PortResult<VerifiedIdentity>;
}
