//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! The connection resolves the user's identity, lets the navigation shell drive
//! the client's screens, and runs chat turns one at a time.

use crate::web::{
    middleware::{read_cookie, SESSION_COOKIE},
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ChatSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use emotionverse_core::{
    conversation::{TurnObserver, TurnState},
    navigation::{self, NavigationShell, Navigator, Screen},
    persona::{self, Persona},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let auth_session_id = read_cookie(&headers, SESSION_COOKIE).map(str::to_string);
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, auth_session_id))
}

//=========================================================================================
// Outbound Adapters
//=========================================================================================

/// Moves the client between screens by sending it `navigate` messages.
struct ClientNavigator {
    outbound: UnboundedSender<ServerMessage>,
}

impl Navigator for ClientNavigator {
    fn show_loading(&mut self) {
        let _ = self.outbound.send(ServerMessage::Loading);
    }

    fn replace(&mut self, screen: Screen) {
        let _ = self.outbound.send(ServerMessage::Navigate { screen });
        if screen == Screen::PersonaPicker {
            let _ = self.outbound.send(ServerMessage::Personas {
                personas: persona::cards(),
            });
        }
    }
}

/// Forwards turn progress to the client as it happens.
struct ClientTurnObserver<'a> {
    outbound: &'a UnboundedSender<ServerMessage>,
}

impl TurnObserver for ClientTurnObserver<'_> {
    fn on_transition(&self, state: &TurnState) {
        let msg = match state {
            TurnState::UserEchoed(message) => ServerMessage::UserEchoed {
                message: message.clone(),
            },
            TurnState::AwaitingModel => ServerMessage::AwaitingModel,
            TurnState::RepliedOk(message) => ServerMessage::Reply {
                message: message.clone(),
                fallback: false,
            },
            TurnState::RepliedFallback(message) => ServerMessage::Reply {
                message: message.clone(),
                fallback: true,
            },
            TurnState::Idle => return,
        };
        let _ = self.outbound.send(msg);
    }
}

fn send_error(outbound: &UnboundedSender<ServerMessage>, message: &str) {
    let _ = outbound.send(ServerMessage::Error {
        message: message.to_string(),
    });
}

//=========================================================================================
// Connection Lifecycle
//=========================================================================================

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, auth_session_id: Option<String>) {
    info!("New WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();

    // --- 1. Single writer task; everything else talks to it through a channel ---
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                warn!("Client went away while sending.");
                break;
            }
        }
    });

    // --- 2. Identity and navigation ---
    let mut session = ChatSession::new(auth_session_id);
    let shell = tokio::spawn(NavigationShell::run(
        session.identity.subscribe(),
        ClientNavigator {
            outbound: outbound.clone(),
        },
    ));
    session.resolve_identity(&app_state).await;

    // --- 3. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(text.as_str(), &app_state, &mut session, &outbound).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    drop(session);
    if let Err(e) = shell.await {
        error!("Navigation shell task failed: {:?}", e);
    }
    drop(outbound);
    let _ = writer.await;
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    session: &mut ChatSession,
    outbound: &UnboundedSender<ServerMessage>,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            send_error(outbound, "Malformed message.");
            return;
        }
    };

    match client_msg {
        ClientMessage::OpenChat { persona } => {
            let Ok(persona) = persona.parse::<Persona>() else {
                send_error(outbound, "Unknown persona.");
                return;
            };
            let Some(screen) = navigation::open_chat(&session.identity.current(), persona) else {
                send_error(outbound, "Sign in to start chatting.");
                return;
            };

            let conversation = app_state.conversations.load_history(persona).await;
            info!("Opened chat with {} ({} messages)", persona, conversation.len());
            let _ = outbound.send(ServerMessage::Navigate { screen });
            let _ = outbound.send(ServerMessage::History {
                persona,
                messages: conversation.messages().to_vec(),
            });
            session.open_chat = Some(conversation);
        }
        ClientMessage::Send { text } => {
            let Some(conversation) = session.open_chat.take() else {
                send_error(outbound, "No chat is open.");
                return;
            };
            let observer = ClientTurnObserver { outbound };
            let conversation = app_state
                .conversations
                .send_turn(conversation, &text, &observer)
                .await;
            session.open_chat = Some(conversation);
        }
        ClientMessage::CloseChat => {
            if session.open_chat.take().is_some() {
                let _ = outbound.send(ServerMessage::Navigate {
                    screen: Screen::PersonaPicker,
                });
                let _ = outbound.send(ServerMessage::Personas {
                    personas: persona::cards(),
                });
            }
        }
        ClientMessage::SignOut => {
            if let Some(id) = session.auth_session_id.take() {
                if let Err(e) = app_state.auth.delete_auth_session(&id).await {
                    error!("Failed to delete auth session: {:?}", e);
                }
            }
            session.open_chat = None;
            session.identity.sign_out();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use emotionverse_core::{
        conversation::{ConversationController, RequestStyle},
        domain::{Identity, Role, User, VerifiedIdentity},
        identity::{ClientEnvironment, IdentityService},
        ports::{
            AuthStore, IdentityProvider, ModelRequest, ModelResponse, ModelService, PortResult,
        },
    };
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    struct Echo;

    #[async_trait]
    impl ModelService for Echo {
        async fn complete(&self, _request: &ModelRequest) -> PortResult<ModelResponse> {
            Ok(ModelResponse {
                body: json!({ "output_text": "so calm" }),
            })
        }
    }

    struct NoProvider;

    #[async_trait]
    impl IdentityProvider for NoProvider {
        fn authorization_url(&self, state: &str) -> PortResult<String> {
            Ok(format!("https://idp.test/auth?state={state}"))
        }

        async fn exchange_code(&self, _code: &str) -> PortResult<VerifiedIdentity> {
            Err(emotionverse_core::ports::PortError::Unauthorized)
        }
    }

    fn app_state(store: Arc<MemoryStore>) -> Arc<AppState> {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: None,
            log_level: tracing::Level::INFO,
            openai_api_key: None,
            chat_model: "gpt-4o-mini".into(),
            single_shot_model: "gpt-5-nano".into(),
            request_style: RequestStyle::Conversation,
            google_client_id: None,
            google_client_secret: None,
            google_redirect_uri: "http://localhost:3000/auth/google/callback".into(),
            sign_in_environments: vec![ClientEnvironment::StoreClient],
            cors_origin: "http://localhost:8081".into(),
        };
        Arc::new(AppState {
            config: Arc::new(config),
            auth: store.clone(),
            identity: Arc::new(IdentityService::new(
                Arc::new(NoProvider),
                vec![ClientEnvironment::StoreClient],
            )),
            conversations: Arc::new(ConversationController::new(
                store,
                Arc::new(Echo),
                RequestStyle::Conversation,
            )),
        })
    }

    fn signed_in_session() -> ChatSession {
        let session = ChatSession::new(None);
        session.identity.resolve(Some(User {
            id: Uuid::new_v4(),
            subject: "sub-1".into(),
            email: None,
        }));
        session
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn error(message: &str) -> ServerMessage {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn open_chat_while_signed_out_is_refused() {
        let state = app_state(Arc::new(MemoryStore::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = ChatSession::new(None);
        session.identity.resolve(None);

        handle_text_message(r#"{"type":"open_chat","persona":"Joy"}"#, &state, &mut session, &tx)
            .await;

        assert_eq!(drain(&mut rx), [error("Sign in to start chatting.")]);
        assert!(session.open_chat.is_none());
    }

    #[tokio::test]
    async fn bad_requests_are_reported() {
        let state = app_state(Arc::new(MemoryStore::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = signed_in_session();

        handle_text_message("not json", &state, &mut session, &tx).await;
        handle_text_message(r#"{"type":"open_chat","persona":"Envy"}"#, &state, &mut session, &tx)
            .await;
        handle_text_message(r#"{"type":"send","text":"hi"}"#, &state, &mut session, &tx).await;

        assert_eq!(
            drain(&mut rx),
            [
                error("Malformed message."),
                error("Unknown persona."),
                error("No chat is open."),
            ]
        );
    }

    #[tokio::test]
    async fn open_then_send_streams_the_turn() {
        let store = Arc::new(MemoryStore::new());
        let state = app_state(store.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = signed_in_session();

        handle_text_message(r#"{"type":"open_chat","persona":"peace"}"#, &state, &mut session, &tx)
            .await;
        assert_eq!(
            drain(&mut rx),
            [
                ServerMessage::Navigate {
                    screen: Screen::Chat(Persona::Peace)
                },
                ServerMessage::History {
                    persona: Persona::Peace,
                    messages: vec![],
                },
            ]
        );

        handle_text_message(r#"{"type":"send","text":"hello"}"#, &state, &mut session, &tx).await;
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 3);
        assert!(
            matches!(&sent[0], ServerMessage::UserEchoed { message } if message.content == "hello")
        );
        assert_eq!(sent[1], ServerMessage::AwaitingModel);
        assert!(matches!(
            &sent[2],
            ServerMessage::Reply { message, fallback: false }
                if message.role == Role::Assistant && message.content == "so calm"
        ));

        let open = session.open_chat.as_ref().unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(
            emotionverse_core::ports::SessionStore::query(store.as_ref(), Persona::Peace)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn close_chat_returns_to_the_picker() {
        let state = app_state(Arc::new(MemoryStore::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = signed_in_session();

        // Nothing open yet: nothing to do.
        handle_text_message(r#"{"type":"close_chat"}"#, &state, &mut session, &tx).await;
        assert!(drain(&mut rx).is_empty());

        handle_text_message(r#"{"type":"open_chat","persona":"Joy"}"#, &state, &mut session, &tx)
            .await;
        drain(&mut rx);
        handle_text_message(r#"{"type":"close_chat"}"#, &state, &mut session, &tx).await;

        assert_eq!(
            drain(&mut rx),
            [
                ServerMessage::Navigate {
                    screen: Screen::PersonaPicker
                },
                ServerMessage::Personas {
                    personas: persona::cards()
                },
            ]
        );
        assert!(session.open_chat.is_none());
    }

    #[tokio::test]
    async fn sign_out_ends_the_auth_session() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .upsert_user(&VerifiedIdentity {
                subject: "sub-1".into(),
                email: None,
            })
            .await
            .unwrap();
        store
            .create_auth_session("s1", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        let state = app_state(store.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut session = ChatSession::new(Some("s1".to_string()));
        session.resolve_identity(&state).await;
        assert_eq!(session.identity.current(), Identity::Present(user));

        handle_text_message(r#"{"type":"open_chat","persona":"Joy"}"#, &state, &mut session, &tx)
            .await;
        handle_text_message(r#"{"type":"sign_out"}"#, &state, &mut session, &tx).await;

        assert_eq!(session.identity.current(), Identity::Absent);
        assert!(session.auth_session_id.is_none());
        assert!(session.open_chat.is_none());
        assert!(store.validate_auth_session("s1").await.is_err());
    }
}
