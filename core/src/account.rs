//! Account endpoints: register, login, profile and password.
//!
//! # Design
//! `AccountClient` follows the same `build_*` / `parse_*` split as
//! `TodoClient`, rooted at `{base_url}/account`. Register and login go out
//! without a bearer header; everything else needs the token that login
//! returned. `AccountSession` runs those round-trips over a `Transport`,
//! checks the form rules first, and keeps the last failure as a message the
//! way `TodoSession` does.
//!
//! The session never stores the token it receives. The host decides where a
//! login lives (see `TokenFile`).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{check_status, from_json, json_request, to_json};
use crate::error::{ApiError, SyncError, ValidationSkip};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::token::TokenSource;
use crate::transport::Transport;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    username: &'a str,
    password_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FullNameBody<'a> {
    full_name: &'a str,
}

/// What `GET /account/profile` returns. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// The change-password form, sent as-is.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

/// Stateless request builder and response parser for `{base}/account`.
#[derive(Debug, Clone)]
pub struct AccountClient {
    base_url: String,
}

impl AccountClient {
    /// `base_url` is the API root, the same one `TodoClient` takes.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_register(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = to_json(&RegisterBody {
            username,
            password_hash: password,
        })?;
        Ok(json_request(HttpMethod::Post, self.url("register"), None, Some(body)))
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = to_json(&LoginBody { username, password })?;
        Ok(json_request(HttpMethod::Post, self.url("login"), None, Some(body)))
    }

    /// The issued token. A 2xx reply without one is a deserialization error.
    pub fn parse_login(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        let reply: LoginReply = from_json(&response.body)?;
        reply
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Deserialization("login reply carried no token".to_string()))
    }

    pub fn build_profile(&self, token: &str) -> HttpRequest {
        json_request(HttpMethod::Get, self.url("profile"), Some(token), None)
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn build_update_full_name(&self, token: &str, full_name: &str) -> Result<HttpRequest, ApiError> {
        let body = to_json(&FullNameBody { full_name })?;
        Ok(json_request(HttpMethod::Put, self.url("profile"), Some(token), Some(body)))
    }

    pub fn parse_update_full_name(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn build_change_password(&self, token: &str, change: &PasswordChange) -> Result<HttpRequest, ApiError> {
        let body = to_json(change)?;
        Ok(json_request(HttpMethod::Put, self.url("change-password"), Some(token), Some(body)))
    }

    pub fn parse_change_password(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn url(&self, action: &str) -> String {
        format!("{}/account/{action}", self.base_url)
    }
}

/// Runs account operations and remembers the last profile and failure.
pub struct AccountSession<T, S> {
    client: AccountClient,
    transport: T,
    tokens: S,
    profile: Option<Profile>,
    error: Option<String>,
}

impl<T: Transport, S: TokenSource> AccountSession<T, S> {
    pub fn new(client: AccountClient, transport: T, tokens: S) -> Self {
        Self {
            client,
            transport,
            tokens,
            profile: None,
            error: None,
        }
    }

    /// The profile from the last successful `fetch_profile`.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<(), SyncError> {
        if username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(ValidationSkip::UsernameTooShort { min: MIN_USERNAME_LEN }.into());
        }
        check_password(password)?;
        self.error = None;
        let request = self.client.build_register(username.trim(), password);
        let result = request
            .and_then(|req| self.send(req))
            .and_then(|res| self.client.parse_register(res));
        self.settle("Registration failed", result)?;
        info!(username = username.trim(), "account registered");
        Ok(())
    }

    /// Log in and hand back the issued token for the host to keep.
    pub fn login(&mut self, username: &str, password: &str) -> Result<String, SyncError> {
        if username.trim().is_empty() {
            return Err(ValidationSkip::BlankUsername.into());
        }
        check_password(password)?;
        self.error = None;
        let request = self.client.build_login(username.trim(), password);
        let result = request
            .and_then(|req| self.send(req))
            .and_then(|res| self.client.parse_login(res));
        let token = self.settle("Login failed", result)?;
        info!(username = username.trim(), "logged in");
        Ok(token)
    }

    pub fn fetch_profile(&mut self) -> Result<&Profile, SyncError> {
        self.error = None;
        let result = self.authorized(
            |client, token| Ok(client.build_profile(token)),
            |client, response| client.parse_profile(response),
        );
        let profile = self.settle("Failed to fetch profile", result)?;
        Ok(self.profile.insert(profile))
    }

    /// Change the display name. A blank name is rejected without a request.
    pub fn update_full_name(&mut self, full_name: &str) -> Result<(), SyncError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationSkip::BlankName.into());
        }
        self.error = None;
        let result = self.authorized(
            |client, token| client.build_update_full_name(token, full_name),
            |client, response| client.parse_update_full_name(response),
        );
        self.settle("Failed to update name", result)?;
        if let Some(profile) = self.profile.as_mut() {
            profile.full_name = Some(full_name.to_string());
        }
        Ok(())
    }

    /// The new password must be confirmed and long enough before anything is
    /// sent.
    pub fn change_password(&mut self, change: &PasswordChange) -> Result<(), SyncError> {
        if change.new_password != change.confirm_password {
            return Err(ValidationSkip::PasswordMismatch.into());
        }
        check_password(&change.new_password)?;
        self.error = None;
        let result = self.authorized(
            |client, token| client.build_change_password(token, change),
            |client, response| client.parse_change_password(response),
        );
        self.settle("Failed to change password", result)?;
        info!("password changed");
        Ok(())
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "response received");
        Ok(response)
    }

    fn authorized<R, B, P>(&self, build: B, parse: P) -> Result<R, ApiError>
    where
        B: FnOnce(&AccountClient, &str) -> Result<HttpRequest, ApiError>,
        P: FnOnce(&AccountClient, HttpResponse) -> Result<R, ApiError>,
    {
        let token = self.tokens.token().ok_or(ApiError::MissingToken)?;
        let response = self.send(build(&self.client, &token)?)?;
        parse(&self.client, response)
    }

    fn settle<R>(&mut self, prefix: &str, result: Result<R, ApiError>) -> Result<R, SyncError> {
        result.map_err(|err| {
            warn!(error = %err, "{prefix}");
            self.error = Some(format!("{prefix}: {err}"));
            err.into()
        })
    }
}

fn check_password(password: &str) -> Result<(), ValidationSkip> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationSkip::PasswordTooShort { min: MIN_PASSWORD_LEN });
    }
    Ok(())
}

impl<T, S> fmt::Debug for AccountSession<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("client", &self.client)
            .field("profile", &self.profile)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
