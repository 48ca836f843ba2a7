//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each CRUD operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The bearer token is passed into every `build_*` call rather than stored,
//! so a token that changes between calls is always picked up.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::TodoItem;

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_todos(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.collection(), token, None)
    }

    pub fn build_create_todo(&self, token: &str, item: &TodoItem) -> Result<HttpRequest, ApiError> {
        let body = to_json(item)?;
        Ok(self.request(HttpMethod::Post, self.collection(), token, Some(body)))
    }

    /// PUT the full record to `todo/{item.id}`.
    pub fn build_update_todo(&self, token: &str, item: &TodoItem) -> Result<HttpRequest, ApiError> {
        let body = to_json(item)?;
        Ok(self.request(HttpMethod::Put, self.member(item.id), token, Some(body)))
    }

    pub fn build_delete_todo(&self, token: &str, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, self.member(id), token, None)
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<TodoItem>, ApiError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    /// The created record, or `None` when the server answered without a body.
    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Option<TodoItem>, ApiError> {
        check_status(&response)?;
        optional_body(&response.body)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Option<TodoItem>, ApiError> {
        check_status(&response)?;
        optional_body(&response.body)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn collection(&self) -> String {
        format!("{}/todo", self.base_url)
    }

    fn member(&self, id: i64) -> String {
        format!("{}/todo/{id}", self.base_url)
    }

    fn request(&self, method: HttpMethod, path: String, token: &str, body: Option<String>) -> HttpRequest {
        json_request(method, path, Some(token), body)
    }
}

/// A JSON request, with a bearer header when `token` is given.
pub(crate) fn json_request(
    method: HttpMethod,
    path: String,
    token: Option<&str>,
    body: Option<String>,
) -> HttpRequest {
    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
    if let Some(token) = token {
        headers.push(("authorization".to_string(), format!("Bearer {token}")));
    }
    HttpRequest {
        method,
        path,
        headers,
        body,
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn optional_body(body: &str) -> Result<Option<TodoItem>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    from_json(body).map(Some)
}

/// Map any non-2xx status to `ApiError::Http`, keeping the server's message.
pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        message: server_message(&response.body),
    })
}

/// Pull a human-readable message out of an error body.
///
/// JSON bodies are searched for `message` then `title`; anything else that
/// is non-empty is used verbatim.
fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "title"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .filter(|msg| !msg.trim().is_empty())
            .map(str::to_string),
        Err(_) => Some(body.to_string()),
    }
}
