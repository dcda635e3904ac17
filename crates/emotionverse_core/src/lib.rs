pub mod conversation;
pub mod domain;
pub mod identity;
pub mod navigation;
pub mod persona;
pub mod ports;
pub mod reply;

pub use conversation::{ConversationController, RequestStyle, TurnObserver, TurnState, APOLOGY};
pub use domain::{AuthSession, Conversation, Identity, Message, Role, User, VerifiedIdentity};
pub use identity::{ClientEnvironment, IdentityService, IdentityWatch, SignInError, SignInNotice};
pub use navigation::{NavigationShell, Navigator, Screen};
pub use persona::{Persona, PersonaCard};
pub use ports::{
    AuthStore, IdentityProvider, ModelRequest, ModelResponse, ModelService, PortError, PortResult,
    SessionStore,
};
pub use reply::{extract_reply, THINKING_PLACEHOLDER};
