//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::{
    auth::{self, NoticeResponse},
    middleware::{read_cookie, SESSION_COOKIE},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json},
    Extension,
};
use emotionverse_core::{
    domain::{Conversation, Identity, Message, User},
    navigation::{route_for, Screen},
    persona::{self, Persona},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        navigation_handler,
        list_personas_handler,
        get_messages_handler,
        send_message_handler,
        auth::start_sign_in_handler,
        auth::sign_in_callback_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            NavigationResponse,
            PersonaResponse,
            MessageResponse,
            ConversationResponse,
            SendMessageRequest,
            NoticeResponse
        )
    ),
    tags(
        (name = "Emotionverse API", description = "Talk to emotion personas backed by an LLM.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NavigationResponse {
    /// `unknown`, `absent` or `present`.
    pub identity: String,
    /// `login` or `persona_picker`; absent while the identity is unresolved.
    pub screen: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PersonaResponse {
    pub name: String,
    pub emoji: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub persona: String,
    pub messages: Vec<MessageResponse>,
}

impl From<&Conversation> for ConversationResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            persona: conversation.persona.name().to_string(),
            messages: conversation.messages().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub text: String,
}

fn screen_name(screen: Screen) -> &'static str {
    match screen {
        Screen::Login => "login",
        Screen::PersonaPicker => "persona_picker",
        Screen::Chat(_) => "chat",
    }
}

fn parse_persona(name: &str) -> Result<Persona, ApiError> {
    name.parse::<Persona>()
        .map_err(|_| ApiError::UnknownPersona(name.to_string()))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Where the client should be, given its auth cookie.
#[utoipa::path(
    get,
    path = "/navigation",
    responses((status = 200, description = "Current route", body = NavigationResponse))
)]
pub async fn navigation_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<NavigationResponse> {
    let identity = match read_cookie(&headers, SESSION_COOKIE) {
        Some(id) => match app_state.auth.validate_auth_session(id).await {
            Ok(user) => Identity::Present(user),
            Err(_) => Identity::Absent,
        },
        None => Identity::Absent,
    };

    Json(NavigationResponse {
        identity: identity.label().to_string(),
        screen: route_for(&identity).map(|s| screen_name(s).to_string()),
    })
}

/// The emotion picker.
#[utoipa::path(
    get,
    path = "/personas",
    responses(
        (status = 200, description = "Available personas", body = [PersonaResponse]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_personas_handler() -> Json<Vec<PersonaResponse>> {
    Json(
        persona::cards()
            .into_iter()
            .map(|card| PersonaResponse {
                name: card.name.to_string(),
                emoji: card.emoji.to_string(),
            })
            .collect(),
    )
}

/// Load a persona's chat history.
#[utoipa::path(
    get,
    path = "/personas/{persona}/messages",
    params(("persona" = String, Path, description = "Persona name, e.g. `Joy`.")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ConversationResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Unknown persona")
    )
)]
pub async fn get_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Path(persona): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let persona = parse_persona(&persona)?;
    let conversation = app_state.conversations.load_history(persona).await;
    Ok(Json((&conversation).into()))
}

/// Send one message and wait for the persona's reply.
#[utoipa::path(
    post,
    path = "/personas/{persona}/messages",
    params(("persona" = String, Path, description = "Persona name, e.g. `Joy`.")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The updated conversation", body = ConversationResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Unknown persona")
    )
)]
pub async fn send_message_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(persona): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let persona = parse_persona(&persona)?;
    info!("User {} talking to {}", user.id, persona);

    let conversation = app_state
        .conversations
        .load_and_send(persona, &req.text, &())
        .await;

    Ok(Json(ConversationResponse::from(&conversation)))
}
