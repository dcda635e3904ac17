//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use emotionverse_core::{ClientEnvironment, RequestStyle};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` keeps everything in process memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub single_shot_model: String,
    pub request_style: RequestStyle,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: String,
    pub sign_in_environments: Vec<ClientEnvironment>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL").ok();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Model Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let single_shot_model =
            std::env::var("SINGLE_SHOT_MODEL").unwrap_or_else(|_| "gpt-5-nano".to_string());
        let request_style = match std::env::var("REQUEST_STYLE") {
            Ok(value) => value.parse::<RequestStyle>().map_err(|_| {
                ConfigError::InvalidValue(
                    "REQUEST_STYLE".to_string(),
                    format!("'{}' is not one of conversation, single_shot", value),
                )
            })?,
            Err(_) => RequestStyle::default(),
        };

        // --- Load Identity Provider Settings ---
        let google_client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
        let google_client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();
        let google_redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/auth/google/callback".to_string());
        let sign_in_environments = parse_environments(
            &std::env::var("SIGN_IN_ENVIRONMENTS").unwrap_or_else(|_| "storeClient".to_string()),
        )?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:8081".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            chat_model,
            single_shot_model,
            request_style,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            sign_in_environments,
            cors_origin,
        })
    }
}

/// Parses a comma-separated list such as `storeClient,standalone`.
pub fn parse_environments(raw: &str) -> Result<Vec<ClientEnvironment>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<ClientEnvironment>().map_err(|_| {
                ConfigError::InvalidValue(
                    "SIGN_IN_ENVIRONMENTS".to_string(),
                    format!("'{}' is not an Expo execution environment", name),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_list_is_trimmed_and_parsed() {
        let parsed = parse_environments(" storeClient , bare,").unwrap();
        assert_eq!(
            parsed,
            vec![ClientEnvironment::StoreClient, ClientEnvironment::Bare]
        );
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = parse_environments("storeClient,devClient").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "SIGN_IN_ENVIRONMENTS"));
    }
}
