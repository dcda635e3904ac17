//! crates/emotionverse_core/src/navigation.rs
//!
//! Decides which screen the client shows, driven only by the identity state.

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::domain::Identity;
use crate::persona::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", content = "persona", rename_all = "snake_case")]
pub enum Screen {
    Login,
    PersonaPicker,
    Chat(Persona),
}

/// `None` while the identity is still resolving: show a loader, don't navigate.
pub fn route_for(identity: &Identity) -> Option<Screen> {
    if !identity.is_resolved() {
        return None;
    }
    Some(match identity.user() {
        Some(_) => Screen::PersonaPicker,
        None => Screen::Login,
    })
}

/// Chat screens are only reachable by a signed-in user.
pub fn open_chat(identity: &Identity, persona: Persona) -> Option<Screen> {
    identity.user().map(|_| Screen::Chat(persona))
}

/// Whatever actually moves the client between screens.
pub trait Navigator: Send {
    fn show_loading(&mut self);
    fn replace(&mut self, screen: Screen);
}

pub struct NavigationShell;

impl NavigationShell {
    /// Re-routes on every identity change until the identity source goes away,
    /// then hands the navigator back.
    pub async fn run<N: Navigator>(mut identity: watch::Receiver<Identity>, mut navigator: N) -> N {
        loop {
            let current = identity.borrow_and_update().clone();
            match route_for(&current) {
                Some(screen) => {
                    debug!("Identity {} -> {:?}", current.label(), screen);
                    navigator.replace(screen);
                }
                None => navigator.show_loading(),
            }

            if identity.changed().await.is_err() {
                break;
            }
        }
        navigator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder(Vec<Option<Screen>>);

    impl Navigator for Recorder {
        fn show_loading(&mut self) {
            self.0.push(None);
        }

        fn replace(&mut self, screen: Screen) {
            self.0.push(Some(screen));
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            subject: "sub".into(),
            email: None,
        }
    }

    #[test]
    fn routes_follow_identity() {
        assert_eq!(route_for(&Identity::Unknown), None);
        assert_eq!(route_for(&Identity::Absent), Some(Screen::Login));
        assert_eq!(
            route_for(&Identity::Present(user())),
            Some(Screen::PersonaPicker)
        );
    }

    #[test]
    fn chat_requires_a_user() {
        assert_eq!(open_chat(&Identity::Absent, Persona::Joy), None);
        assert_eq!(open_chat(&Identity::Unknown, Persona::Joy), None);
        assert_eq!(
            open_chat(&Identity::Present(user()), Persona::Joy),
            Some(Screen::Chat(Persona::Joy))
        );
    }

    #[tokio::test]
    async fn shell_loads_then_follows_every_change() {
        let (tx, rx) = watch::channel(Identity::Unknown);
        let shell = tokio::spawn(NavigationShell::run(rx, Recorder::default()));

        tokio::task::yield_now().await;
        tx.send_replace(Identity::Absent);
        tokio::task::yield_now().await;
        tx.send_replace(Identity::Present(user()));
        tokio::task::yield_now().await;
        drop(tx);

        let recorder = shell.await.unwrap();
        assert_eq!(recorder.0.first(), Some(&None));
        assert_eq!(recorder.0.last(), Some(&Some(Screen::PersonaPicker)));
    }

    #[test]
    fn screen_serializes_with_persona() {
        let json = serde_json::to_value(Screen::Chat(Persona::Anger)).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "chat", "persona": "Anger" }));
        let json = serde_json::to_value(Screen::Login).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "login" }));
    }
}
