//! crates/emotionverse_core/src/conversation.rs
//!
//! The conversation controller: loads a persona's history and runs one
//! user/assistant turn at a time against the store and the language model.

use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::domain::{now_millis, Conversation, Message};
use crate::persona::Persona;
use crate::ports::{ModelRequest, ModelService, SessionStore};
use crate::reply::extract_reply;

/// Assistant reply used whenever the model call itself fails.
pub const APOLOGY: &str = "Sorry, I got overwhelmed for a second 😅. Can we try again?";

const SINGLE_SHOT_FRAMING: &str = "You are not a therapist or a guide. You are the one *experiencing* this emotion. Speak like you feel it.";

/// How the model request for a turn is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RequestStyle {
    /// Persona prompt plus the full working conversation.
    #[default]
    Conversation,
    /// One composed prompt with the persona and only the latest user text.
    SingleShot,
}

//=========================================================================================
// Turn State Machine
//=========================================================================================

/// `Idle → UserEchoed → AwaitingModel → {RepliedOk | RepliedFallback} → Idle`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    UserEchoed(Message),
    AwaitingModel,
    RepliedOk(Message),
    RepliedFallback(Message),
}

/// Receives every state transition of a turn as it happens.
pub trait TurnObserver: Send + Sync {
    fn on_transition(&self, state: &TurnState);
}

impl TurnObserver for () {
    fn on_transition(&self, _state: &TurnState) {}
}

impl TurnObserver for mpsc::UnboundedSender<TurnState> {
    fn on_transition(&self, state: &TurnState) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.send(state.clone());
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct ConversationController {
    store: Arc<dyn SessionStore>,
    model: Arc<dyn ModelService>,
    style: RequestStyle,
    turn_locks: HashMap<Persona, Mutex<()>>,
}

impl ConversationController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        model: Arc<dyn ModelService>,
        style: RequestStyle,
    ) -> Self {
        let turn_locks = Persona::iter().map(|p| (p, Mutex::new(()))).collect();
        Self {
            store,
            model,
            style,
            turn_locks,
        }
    }

    pub fn style(&self) -> RequestStyle {
        self.style
    }

    /// Loads the persona's stored messages in timestamp order.
    ///
    /// An unreachable store yields an empty conversation so the chat can still start.
    pub async fn load_history(&self, persona: Persona) -> Conversation {
        match self.store.query(persona).await {
            Ok(messages) => {
                debug!("Loaded {} messages for {}", messages.len(), persona);
                Conversation::from_messages(persona, messages)
            }
            Err(e) => {
                error!("Error loading messages for {}: {}", persona, e);
                Conversation::new(persona)
            }
        }
    }

    /// Runs one turn and returns the conversation with the user message and the
    /// assistant reply appended. Blank input returns the conversation untouched.
    ///
    /// For callers that hold their own copy of the conversation, like an open chat.
    pub async fn send_turn(
        &self,
        conversation: Conversation,
        user_text: &str,
        observer: &dyn TurnObserver,
    ) -> Conversation {
        if user_text.trim().is_empty() {
            return conversation;
        }
        let _turn = self.lock_turn(conversation.persona).await;
        self.run_turn(conversation, user_text, observer).await
    }

    /// Like [`send_turn`](Self::send_turn), but reads the history from the store
    /// after the turn lock is taken, so earlier turns on the persona are always
    /// part of the context.
    pub async fn load_and_send(
        &self,
        persona: Persona,
        user_text: &str,
        observer: &dyn TurnObserver,
    ) -> Conversation {
        if user_text.trim().is_empty() {
            return self.load_history(persona).await;
        }
        let _turn = self.lock_turn(persona).await;
        let conversation = self.load_history(persona).await;
        self.run_turn(conversation, user_text, observer).await
    }

    async fn lock_turn(&self, persona: Persona) -> Option<MutexGuard<'_, ()>> {
        match self.turn_locks.get(&persona) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    /// The turn itself. Callers hold the persona's turn lock.
    async fn run_turn(
        &self,
        mut conversation: Conversation,
        user_text: &str,
        observer: &dyn TurnObserver,
    ) -> Conversation {
        let persona = conversation.persona;

        // --- 1. Local echo ---
        let user_message = Message::user(user_text, conversation.next_timestamp(now_millis()));
        conversation.push(user_message.clone());
        observer.on_transition(&TurnState::UserEchoed(user_message.clone()));

        // --- 2. Persist the user's message before the model sees it ---
        if let Err(e) = self.store.append(persona, &user_message).await {
            warn!("Failed to persist user message for {}: {}", persona, e);
        }

        // --- 3. Ask the model ---
        let request = self.build_request(&conversation, user_text);
        observer.on_transition(&TurnState::AwaitingModel);

        let (reply_text, fallback) = match self.model.complete(&request).await {
            Ok(response) => (extract_reply(&response.body), false),
            Err(e) => {
                error!("Model error for {}: {}", persona, e);
                (APOLOGY.to_string(), true)
            }
        };

        let reply = Message::assistant(reply_text, conversation.next_timestamp(now_millis()));
        conversation.push(reply.clone());
        if fallback {
            observer.on_transition(&TurnState::RepliedFallback(reply.clone()));
        } else {
            observer.on_transition(&TurnState::RepliedOk(reply.clone()));
        }

        // --- 4. Persist the reply (best-effort) ---
        if let Err(e) = self.store.append(persona, &reply).await {
            warn!("Failed to persist assistant message for {}: {}", persona, e);
        }

        info!(
            persona = persona.name(),
            fallback,
            messages = conversation.len(),
            "Turn complete"
        );
        observer.on_transition(&TurnState::Idle);
        conversation
    }

    fn build_request(&self, conversation: &Conversation, user_text: &str) -> ModelRequest {
        let persona_prompt = conversation.persona.system_prompt();
        match self.style {
            RequestStyle::Conversation => ModelRequest::Conversation {
                system_prompt: persona_prompt.to_string(),
                messages: conversation.messages().to_vec(),
            },
            RequestStyle::SingleShot => ModelRequest::SingleShot {
                prompt: format!(
                    "{persona_prompt}\n{SINGLE_SHOT_FRAMING}\nUser said: \"{user_text}\""
                ),
            },
        }
    }
}
