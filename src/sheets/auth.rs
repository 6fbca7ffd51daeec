//! Google service account authentication.
//!
//! Signs an RS256 JWT with the service account key and exchanges it for a
//! short-lived bearer token, which is cached until shortly before expiry.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// OAuth scope for reading and writing spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens are refreshed this many seconds before they expire.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Lifetime requested for the signed assertion.
const ASSERTION_TTL_SECS: u64 = 3600;

/// Errors raised while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read service account file: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("Failed to parse service account file: {0}")]
    KeyParse(#[from] serde_json::Error),

    #[error("Failed to sign JWT: {0}")]
    Jwt(String),

    #[error("Token endpoint returned HTTP {status}: {message}")]
    TokenRequest { status: u16, message: String },

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("System clock error: {0}")]
    Clock(String),
}

/// The fields of a service account JSON key the bot needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_owned()
}

impl ServiceAccountKey {
    /// Loads a key from the JSON file downloaded from the Cloud console.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: u64,
}

/// Issues and caches bearer tokens for a service account.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Creates an authenticator with the spreadsheets scope.
    #[must_use]
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scope: SPREADSHEETS_SCOPE.to_owned(),
            cached: Mutex::new(None),
        }
    }

    /// Service account e-mail (the spreadsheet must be shared with it).
    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Returns a valid access token, fetching a new one if needed.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, AuthError> {
        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        // Held across the exchange so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        let now = now_unix()?;

        if let Some(token) = cached.as_ref()
            && token.expires_at > now + EXPIRY_MARGIN_SECS
        {
            return Ok(token.token.clone());
        }

        debug!("Requesting new access token for {}", self.key.client_email);
        let assertion = self.generate_jwt(now)?;

        let response = http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read token response body".to_owned());
            return Err(AuthError::TokenRequest {
                status: status.as_u16(),
                message,
            });
        }

        let payload: TokenResponse = response.json().await?;
        info!(
            "Obtained access token, expires in {} seconds",
            payload.expires_in
        );

        *cached = Some(CachedToken {
            token: payload.access_token.clone(),
            expires_at: now + payload.expires_in,
        });

        Ok(payload.access_token)
    }

    fn generate_jwt(&self, now: u64) -> Result<String, AuthError> {
        #[derive(Debug, Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|error| AuthError::Jwt(error.to_string()))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|error| AuthError::Jwt(error.to_string()))
    }
}

fn now_unix() -> Result<u64, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|error| AuthError::Clock(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_json() -> &'static str {
        r#"{
            "type": "service_account",
            "client_email": "bot@project.iam.gserviceaccount.com",
            "private_key": "not a pem",
            "private_key_id": "abc"
        }"#
    }

    #[test]
    fn test_load_key_defaults_token_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, key_json()).unwrap();

        let key = ServiceAccountKey::load(&path).unwrap();
        assert_eq!(key.client_email, "bot@project.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key: ServiceAccountKey = serde_json::from_str(key_json()).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("not a pem"));
        assert!(debug.contains("bot@project"));
    }

    #[test]
    fn test_invalid_pem_is_jwt_error() {
        let key: ServiceAccountKey = serde_json::from_str(key_json()).unwrap();
        let auth = ServiceAccountAuth::new(key);
        assert!(matches!(auth.generate_jwt(1_700_000_000), Err(AuthError::Jwt(_))));
    }

    #[test]
    fn test_missing_key_file() {
        assert!(matches!(
            ServiceAccountKey::load("/nonexistent/key.json"),
            Err(AuthError::KeyFile(_))
        ));
    }
}
