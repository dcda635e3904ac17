//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SessionStore` and `AuthStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emotionverse_core::domain::{Message, Role, User, VerifiedIdentity};
use emotionverse_core::persona::Persona;
use emotionverse_core::ports::{AuthStore, PortError, PortResult, SessionStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports on Postgres.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    subject: String,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            subject: self.subject,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    role: String,
    content: String,
    timestamp_ms: i64,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| PortError::Unexpected(format!("Unknown message role '{}'", self.role)))?;
        Ok(Message {
            role,
            content: self.content,
            timestamp: self.timestamp_ms,
        })
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn append(&self, persona: Persona, message: &Message) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (persona, role, content, timestamp_ms) VALUES ($1, $2, $3, $4)",
        )
        .bind(persona.name())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn query(&self, persona: Persona) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT role, content, timestamp_ms FROM chat_messages WHERE persona = $1 ORDER BY timestamp_ms ASC, id ASC",
        )
        .bind(persona.name())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn upsert_user(&self, identity: &VerifiedIdentity) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, subject, email) VALUES ($1, $2, $3) \
             ON CONFLICT (subject) DO UPDATE SET email = EXCLUDED.email \
             RETURNING id, subject, email",
        )
        .bind(Uuid::new_v4())
        .bind(&identity.subject)
        .bind(&identity.email)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.subject, u.email FROM auth_sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record
            .map(UserRecord::to_domain)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
