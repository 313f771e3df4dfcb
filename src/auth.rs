//! Sign-in, sign-up and sign-out against the backend's auth endpoints.
//!
//! Token issuance and validation belong to the backend; this side only
//! persists the returned access token in the shared [`Session`].

use crate::api::{build_http_client, decode, join_url, send};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::{Session, SessionError};
use crate::types::{AuthResponse, SignInCredentials, SignUpCredentials};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Message for a form-level error line.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api(err) => err.detail.clone(),
            AuthError::Session(err) => err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl AuthClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub async fn sign_in(&self, credentials: &SignInCredentials) -> Result<AuthResponse, AuthError> {
        let response = self.post("/api/auth/signin", credentials).await?;
        self.session.set_token(&response.access_token)?;
        info!(user = %response.user.email, "Signed in");
        Ok(response)
    }

    pub async fn sign_up(&self, credentials: &SignUpCredentials) -> Result<AuthResponse, AuthError> {
        let response = self.post("/api/auth/signup", credentials).await?;
        self.session.set_token(&response.access_token)?;
        info!(user = %response.user.email, "Signed up");
        Ok(response)
    }

    /// Drop the stored token. No request is made.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        self.session.clear()?;
        info!("Signed out");
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.session.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<AuthResponse, AuthError> {
        let request = self
            .http
            .post(join_url(&self.base_url, path))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body);
        let value = send(request).await.map_err(|err| {
            warn!(path, detail = %err.detail, "Authentication request failed");
            relabel(err)
        })?;
        Ok(decode(value)?)
    }
}

/// Auth failures carry their own coarse message.
fn relabel(err: ApiError) -> ApiError {
    match err.status_code {
        Some(status) => err.with_message(format!("Auth Error: {}", status)),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_relabel_status_errors() {
        let err = relabel(ApiError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Invalid email or password"}"#,
        ));
        assert_eq!(err.message, "Auth Error: 401");
        assert_eq!(
            AuthError::Api(err).user_message(),
            "Invalid email or password"
        );

        let transport = relabel(ApiError::transport("connection refused"));
        assert_eq!(transport.message, "Network Error");
    }
}
