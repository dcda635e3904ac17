//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the client app and the API server.

use emotionverse_core::{
    domain::Message,
    navigation::Screen,
    persona::{Persona, PersonaCard},
};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The user picked an emotion. Loads its history.
    OpenChat { persona: String },

    /// The user pressed send in the open chat.
    Send { text: String },

    /// The chat screen was left; its in-memory copy is discarded.
    CloseChat,

    SignOut,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The identity is still resolving; show a blocking spinner.
    Loading,

    /// Replace the current screen.
    Navigate { screen: Screen },

    /// Picker contents, sent whenever the picker is shown.
    Personas { personas: Vec<PersonaCard> },

    /// The stored conversation for a freshly opened chat.
    History {
        persona: Persona,
        messages: Vec<Message>,
    },

    /// The user's own bubble, sent before the model is asked.
    UserEchoed { message: Message },

    /// The UI can show a "typing..." indicator.
    AwaitingModel,

    /// The persona's answer. `fallback` is set when the model call failed.
    Reply { message: Message, fallback: bool },

    /// Reports a problem with the client's request.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_are_type_tagged() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"open_chat","persona":"Joy"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::OpenChat {
                persona: "Joy".into()
            }
        );
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"close_chat"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CloseChat);
    }

    #[test]
    fn server_navigate_nests_the_screen() {
        let msg = ServerMessage::Navigate {
            screen: Screen::Chat(Persona::Peace),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "navigate", "screen": { "name": "chat", "persona": "Peace" } })
        );
    }

    #[test]
    fn reply_carries_fallback_flag() {
        let msg = ServerMessage::Reply {
            message: Message::assistant("hi", 5),
            fallback: true,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "reply",
                "message": { "role": "assistant", "content": "hi", "timestamp": 5 },
                "fallback": true
            })
        );
    }
}
