//! services/api/src/adapters/google.rs
//!
//! This module contains the adapter for Google Sign-In.
//! It implements the `IdentityProvider` port from the `core` crate.
//!
//! ID-token verification is delegated to Google's `tokeninfo` endpoint; the
//! adapter only checks that the token was minted for our client.

use async_trait::async_trait;
use emotionverse_core::domain::VerifiedIdentity;
use emotionverse_core::ports::{IdentityProvider, PortError, PortResult};
use serde::Deserialize;
use tracing::{error, warn};
use url::Url;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct GoogleIdentityAdapter {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleIdentityAdapter {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for GoogleIdentityAdapter {
    fn authorization_url(&self, state: &str) -> PortResult<String> {
        let url = Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> PortResult<VerifiedIdentity> {
        // 1. Trade the authorization code for an ID token
        let token = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| {
                error!("Google token exchange rejected: {}", e);
                PortError::Unauthorized
            })?
            .json::<TokenResponse>()
            .await
            .map_err(transport)?;

        // 2. Let Google verify the token
        let info = self
            .http
            .get(TOKENINFO_ENDPOINT)
            .query(&[("id_token", token.id_token.as_str())])
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(|e| {
                error!("Google rejected the ID token: {}", e);
                PortError::Unauthorized
            })?
            .json::<TokenInfo>()
            .await
            .map_err(transport)?;

        // 3. The token must be ours
        if info.aud != self.client_id {
            warn!("ID token audience mismatch: {}", info.aud);
            return Err(PortError::Unauthorized);
        }

        Ok(VerifiedIdentity {
            subject: info.sub,
            email: info.email,
        })
    }
}
