//! crates/emotionverse_core/src/identity.rs
//!
//! The app's view of the identity provider: an observable tri-state identity
//! and the guarded sign-in entry point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::{Identity, User, VerifiedIdentity};
use crate::ports::{IdentityProvider, PortError, PortResult};

//=========================================================================================
// Observable Identity
//=========================================================================================

/// Holds the current identity and notifies subscribers on every change.
/// Starts out `Unknown` until someone resolves it.
pub struct IdentityWatch {
    tx: watch::Sender<Identity>,
}

impl IdentityWatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Identity::Unknown);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    pub fn resolve(&self, user: Option<User>) {
        let next = match user {
            Some(user) => Identity::Present(user),
            None => Identity::Absent,
        };
        info!("Auth state changed: {}", next.label());
        self.tx.send_replace(next);
    }

    pub fn sign_out(&self) {
        self.resolve(None);
    }
}

impl Default for IdentityWatch {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// Sign-in Guard
//=========================================================================================

/// Where the client app is running, using Expo's execution environment names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ClientEnvironment {
    /// Expo Go.
    StoreClient,
    Standalone,
    Bare,
}

/// A user-facing explanation shown instead of starting the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInNotice {
    pub title: String,
    pub message: String,
}

impl SignInNotice {
    pub fn unsupported_environment() -> Self {
        Self {
            title: "Google Sign-In Unavailable".to_string(),
            message: "Google Sign-In works only in Expo Go during development.\n\nTo use it in your Dev Client or Play Store app, you'll need to verify your app and add a valid redirect URI in the Google Cloud Console.".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("{}", .0.title)]
    Unsupported(SignInNotice),
    #[error(transparent)]
    Port(#[from] PortError),
}

//=========================================================================================
// Identity Service
//=========================================================================================

pub struct IdentityService {
    provider: Arc<dyn IdentityProvider>,
    supported: Vec<ClientEnvironment>,
}

impl IdentityService {
    pub fn new(provider: Arc<dyn IdentityProvider>, supported: Vec<ClientEnvironment>) -> Self {
        Self {
            provider,
            supported,
        }
    }

    pub fn supports(&self, environment: ClientEnvironment) -> bool {
        self.supported.contains(&environment)
    }

    /// Starts the redirect flow, returning the provider URL to send the client to.
    /// Completion is observed later through the identity changing.
    pub fn sign_in(
        &self,
        environment: ClientEnvironment,
        state: &str,
    ) -> Result<String, SignInError> {
        if !self.supports(environment) {
            warn!("Sign-in requested from unsupported environment: {}", environment);
            return Err(SignInError::Unsupported(
                SignInNotice::unsupported_environment(),
            ));
        }
        info!("Starting sign-in redirect for environment: {}", environment);
        Ok(self.provider.authorization_url(state)?)
    }

    pub async fn complete_sign_in(&self, code: &str) -> PortResult<VerifiedIdentity> {
        let identity = self.provider.exchange_code(code).await?;
        info!(
            "Sign-in successful for {}",
            identity.email.as_deref().unwrap_or(&identity.subject)
        );
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct StubProvider;

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn authorization_url(&self, state: &str) -> PortResult<String> {
            Ok(format!("https://idp.test/auth?state={state}"))
        }

        async fn exchange_code(&self, code: &str) -> PortResult<VerifiedIdentity> {
            if code == "good" {
                Ok(VerifiedIdentity {
                    subject: "sub-1".into(),
                    email: Some("joy@example.com".into()),
                })
            } else {
                Err(PortError::Unauthorized)
            }
        }
    }

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(StubProvider), vec![ClientEnvironment::StoreClient])
    }

    #[test]
    fn supported_environment_gets_a_redirect() {
        let url = service()
            .sign_in(ClientEnvironment::StoreClient, "xyz")
            .unwrap();
        assert_eq!(url, "https://idp.test/auth?state=xyz");
    }

    #[test]
    fn unsupported_environment_gets_a_notice() {
        match service().sign_in(ClientEnvironment::Standalone, "xyz") {
            Err(SignInError::Unsupported(notice)) => {
                assert_eq!(notice.title, "Google Sign-In Unavailable");
                assert!(notice.message.contains("Expo Go"));
            }
            other => panic!("expected notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_sign_in_passes_provider_errors_through() {
        assert!(service().complete_sign_in("good").await.is_ok());
        assert!(matches!(
            service().complete_sign_in("bad").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn watch_starts_unknown_and_notifies_changes() {
        let identity = IdentityWatch::new();
        let mut rx = identity.subscribe();
        assert_eq!(*rx.borrow_and_update(), Identity::Unknown);

        let user = User {
            id: Uuid::new_v4(),
            subject: "sub-1".into(),
            email: None,
        };
        identity.resolve(Some(user.clone()));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Identity::Present(user));

        identity.sign_out();
        rx.changed().await.unwrap();
        assert_eq!(identity.current(), Identity::Absent);
    }

    #[test]
    fn environment_names_match_expo() {
        assert_eq!(
            "storeClient".parse::<ClientEnvironment>().unwrap(),
            ClientEnvironment::StoreClient
        );
        assert_eq!(ClientEnvironment::Bare.to_string(), "bare");
    }
}
