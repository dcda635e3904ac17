//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the store ports. Used when no `DATABASE_URL`
//! is configured, and by the integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emotionverse_core::domain::{AuthSession, Message, User, VerifiedIdentity};
use emotionverse_core::persona::Persona;
use emotionverse_core::ports::{AuthStore, PortError, PortResult, SessionStore};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    messages: RwLock<HashMap<Persona, Vec<Message>>>,
    users: RwLock<HashMap<String, User>>,
    sessions: RwLock<HashMap<String, AuthSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn append(&self, persona: Persona, message: &Message) -> PortResult<()> {
        self.messages
            .write()
            .await
            .entry(persona)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn query(&self, persona: Persona) -> PortResult<Vec<Message>> {
        let mut messages = self
            .messages
            .read()
            .await
            .get(&persona)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> PortResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .entry(identity.subject.clone())
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                subject: identity.subject.clone(),
                email: None,
            });
        user.email = identity.email.clone();
        Ok(user.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions.write().await.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User> {
        let user_id = match self.sessions.read().await.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => session.user_id,
            _ => return Err(PortError::Unauthorized),
        };

        self.users
            .read()
            .await
            .values()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn query_orders_out_of_order_appends() {
        let store = MemoryStore::new();
        for ts in [30, 10, 20] {
            store
                .append(Persona::Sadness, &Message::user(ts.to_string(), ts))
                .await
                .unwrap();
        }
        let stamps: Vec<i64> = store
            .query(Persona::Sadness)
            .await
            .unwrap()
            .iter()
            .map(|m| m.timestamp)
            .collect();
        assert_eq!(stamps, [10, 20, 30]);
        assert!(store.query(Persona::Joy).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_expire_and_can_be_deleted() {
        let store = MemoryStore::new();
        let user = store
            .upsert_user(&VerifiedIdentity {
                subject: "sub-9".into(),
                email: Some("a@b.c".into()),
            })
            .await
            .unwrap();

        store
            .create_auth_session("live", user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        store
            .create_auth_session("stale", user.id, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.validate_auth_session("live").await.unwrap(), user);
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));

        store.delete_auth_session("live").await.unwrap();
        assert!(store.validate_auth_session("live").await.is_err());
    }

    #[tokio::test]
    async fn upsert_keeps_the_same_user_id() {
        let store = MemoryStore::new();
        let identity = VerifiedIdentity {
            subject: "same".into(),
            email: None,
        };
        let first = store.upsert_user(&identity).await.unwrap();
        let second = store.upsert_user(&identity).await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
