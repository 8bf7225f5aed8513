//! Sign-in state on top of a hosted auth service.
//!
//! The service is reached through [`AuthClient`]; [`AuthState`] keeps the
//! current user and session and turns every failure into a stored message.

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::storage::KvStore;

pub const SESSION_KEY: &str = "wallx.auth.session";
pub const USER_KEY: &str = "wallx.auth.user";
pub const RESET_REDIRECT: &str = "wallx://reset-password";
pub const VERIFY_EMAIL_NOTICE: &str = "Please check your email to verify your account before logging in.";
pub const RESET_NOTICE: &str = "Check your email for a password reset link";

const UNKNOWN_ERROR: &str = "An unknown error occurred";
// refresh a little before the server rejects the token
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<attohttpc::Error> for AuthError {
    fn from(e: attohttpc::Error) -> Self {
        AuthError::new(e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::new(e.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        AuthError::new(format!("{:#}", e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at - EXPIRY_MARGIN_SECS <= now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

/// Operations of the hosted auth service.
pub trait AuthClient: Send + Sync {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError>;
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
    fn get_session(&self) -> Result<Option<AuthSession>, AuthError>;
    fn get_user(&self) -> Result<Option<AuthUser>, AuthError>;
    fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), AuthError>;
}

/// Both shapes the token and signup endpoints answer with.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<AuthUser>,
    id: Option<String>,
    email: Option<String>,
}

impl TokenResponse {
    fn into_response(self) -> AuthResponse {
        let user = self.user.or_else(|| {
            self.id.map(|id| AuthUser { id, email: self.email })
        });
        let session = match (self.access_token, user.clone()) {
            (Some(access_token), Some(user)) => Some(AuthSession {
                access_token,
                refresh_token: self.refresh_token,
                expires_at: self
                    .expires_at
                    .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs)),
                user,
            }),
            _ => None,
        };
        AuthResponse { user, session }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.msg.or(e.message).or(e.error_description).or(e.error))
        .unwrap_or_else(|| format!("Auth service error: {}", status))
}

/// [`AuthClient`] for a Supabase-hosted auth REST API. The current session
/// lives in secure storage under [`SESSION_KEY`] and [`USER_KEY`].
pub struct SupabaseAuth {
    base_url: String,
    anon_key: String,
    timeout: Duration,
    storage: Arc<dyn KvStore>,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration, storage: Arc<dyn KvStore>) -> Self {
        Self {
            base_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            timeout,
            storage,
        }
    }

    fn post(&self, path: &str, body: serde_json::Value, bearer: Option<&str>) -> Result<String, AuthError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let bearer = bearer.unwrap_or(&self.anon_key);
        let response = attohttpc::post(url)
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", bearer))
            .timeout(self.timeout)
            .json(&body)?
            .send()?;
        let status = response.status().as_u16();
        let success = response.is_success();
        let text = response.text()?;
        if !success {
            return Err(AuthError::new(error_message(status, &text)));
        }
        Ok(text)
    }

    fn store(&self, session: Option<&AuthSession>) -> Result<(), AuthError> {
        match session {
            Some(session) => {
                self.storage.set_item(SESSION_KEY, &serde_json::to_string(session)?)?;
                self.storage.set_item(USER_KEY, &serde_json::to_string(&session.user)?)?;
            }
            None => {
                self.storage.remove_item(SESSION_KEY)?;
                self.storage.remove_item(USER_KEY)?;
            }
        }
        Ok(())
    }

    fn stored_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let Some(raw) = self.storage.get_item(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Dropping unreadable stored session: {}", e);
                self.store(None)?;
                Ok(None)
            }
        }
    }

    fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthResponse, AuthError> {
        let text = self.post(&format!("/token?grant_type={}", grant_type), body, None)?;
        let response = serde_json::from_str::<TokenResponse>(&text)?.into_response();
        self.store(response.session.as_ref())?;
        Ok(response)
    }
}

impl AuthClient for SupabaseAuth {
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let text = self.post("/signup", serde_json::json!({ "email": email, "password": password }), None)?;
        let response = serde_json::from_str::<TokenResponse>(&text)?.into_response();
        if response.session.is_some() {
            self.store(response.session.as_ref())?;
        }
        Ok(response)
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        self.grant("password", serde_json::json!({ "email": email, "password": password }))
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.stored_session()? {
            // the local session is dropped even if the server call fails
            if let Err(e) = self.post("/logout", serde_json::json!({}), Some(&session.access_token)) {
                warn!("Server sign-out failed: {}", e);
            }
        }
        self.store(None)
    }

    fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let Some(session) = self.stored_session()? else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now().timestamp()) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.clone() else {
            self.store(None)?;
            return Ok(None);
        };
        info!("Refreshing expired session");
        let refreshed = self.grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))?;
        Ok(refreshed.session)
    }

    fn get_user(&self) -> Result<Option<AuthUser>, AuthError> {
        let Some(session) = self.get_session()? else {
            return Ok(None);
        };
        let url = format!("{}/user", self.base_url);
        debug!("GET {}", url);
        let response = attohttpc::get(url)
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", session.access_token))
            .timeout(self.timeout)
            .send()?;
        let status = response.status().as_u16();
        let success = response.is_success();
        let text = response.text()?;
        if !success {
            return Err(AuthError::new(error_message(status, &text)));
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.post(
            "/recover",
            serde_json::json!({ "email": email, "redirect_to": redirect_to }),
            None,
        )?;
        Ok(())
    }
}

/// Current sign-in state for the app.
pub struct AuthState {
    client: Arc<dyn AuthClient>,
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Informational message for the user, e.g. "check your email".
    pub notice: Option<String>,
}

impl AuthState {
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        Self {
            client,
            user: None,
            session: None,
            is_loading: true,
            error: None,
            notice: None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.email.as_deref())
    }

    /// First letter of the email, upper-cased; `U` when unknown.
    pub fn avatar_initial(&self) -> char {
        self.email()
            .and_then(|email| email.chars().next())
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn load_session(&mut self) {
        self.is_loading = true;
        match self.client.get_session() {
            Ok(Some(session)) => {
                self.user = Some(session.user.clone());
                self.session = Some(session);
            }
            Ok(None) => {}
            Err(e) => error!("Session error: {}", e),
        }
        self.is_loading = false;
    }

    pub fn sign_in(&mut self, email: &str, password: &str) {
        self.begin();
        match self.client.sign_in_with_password(email, password) {
            Ok(response) => {
                self.user = response.user;
                self.session = response.session;
                info!("Signed in");
            }
            Err(e) => self.fail(e, "Failed to sign in"),
        }
        self.is_loading = false;
    }

    pub fn sign_up(&mut self, email: &str, password: &str) {
        self.begin();
        match self.client.sign_up(email, password) {
            Ok(AuthResponse { session: None, .. }) => {
                self.notice = Some(VERIFY_EMAIL_NOTICE.to_string());
            }
            Ok(response) => {
                self.user = response.user;
                self.session = response.session;
                info!("Signed up");
            }
            Err(e) => self.fail(e, "Failed to sign up"),
        }
        self.is_loading = false;
    }

    pub fn sign_out(&mut self) {
        self.begin();
        match self.client.sign_out() {
            Ok(()) => {
                self.user = None;
                self.session = None;
                info!("Signed out");
            }
            Err(e) => self.fail(e, "Failed to sign out"),
        }
        self.is_loading = false;
    }

    pub fn reset_password(&mut self, email: &str) {
        self.begin();
        match self.client.reset_password_for_email(email, RESET_REDIRECT) {
            Ok(()) => self.notice = Some(RESET_NOTICE.to_string()),
            Err(e) => self.fail(e, "Failed to reset password"),
        }
        self.is_loading = false;
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
        self.notice = None;
    }

    fn fail(&mut self, e: AuthError, default: &str) {
        let message = if e.message.trim().is_empty() {
            default.to_string()
        } else {
            e.message
        };
        warn!("{}: {}", default, message);
        self.error = Some(message);
    }
}

/// Client used when no auth service is configured; every call fails.
#[derive(Debug, Default)]
pub struct UnconfiguredAuth;

impl UnconfiguredAuth {
    fn unavailable<T>() -> Result<T, AuthError> {
        Err(AuthError::new("Authentication is not configured"))
    }
}

impl AuthClient for UnconfiguredAuth {
    fn sign_up(&self, _email: &str, _password: &str) -> Result<AuthResponse, AuthError> {
        Self::unavailable()
    }

    fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<AuthResponse, AuthError> {
        Self::unavailable()
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(None)
    }

    fn get_user(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(None)
    }

    fn reset_password_for_email(&self, _email: &str, _redirect_to: &str) -> Result<(), AuthError> {
        Self::unavailable()
    }
}
