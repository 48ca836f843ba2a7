//! Where the bearer token comes from.
//!
//! A login flow writes the token somewhere (a `TokenFile`, the environment)
//! and the session only reads it, once per operation, at the moment the
//! request is built. Sources can be chained with `Fallback`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// How long a stored login stays valid.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Supplies the current bearer token, if any.
pub trait TokenSource {
    fn token(&self) -> Option<String>;
}

impl<T: TokenSource + ?Sized> TokenSource for &T {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

/// A token fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        non_blank(&self.0)
    }
}

/// Reads the named environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(|t| non_blank(&t))
    }
}

/// Asks `0` first and `1` only when `0` has no token.
#[derive(Debug, Clone)]
pub struct Fallback<A, B>(pub A, pub B);

impl<A: TokenSource, B: TokenSource> TokenSource for Fallback<A, B> {
    fn token(&self) -> Option<String> {
        self.0.token().or_else(|| self.1.token())
    }
}

#[derive(Debug, Error)]
pub enum TokenFileError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenDoc {
    token: String,
    expires_at: DateTime<Utc>,
}

/// A login remembered on disk, valid for `TOKEN_LIFETIME_DAYS`.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remember `token`, replacing any earlier login.
    pub fn store(&self, token: &str, now: DateTime<Utc>) -> Result<(), TokenFileError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let doc = TokenDoc {
            token: token.to_string(),
            expires_at: now + Duration::days(TOKEN_LIFETIME_DAYS),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&doc)?)?;
        debug!(path = %self.path.display(), "token stored");
        Ok(())
    }

    /// Forget the stored login. Returns whether there was one.
    pub fn clear(&self) -> Result<bool, TokenFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// The stored token if it has not expired by `now`.
    pub fn token_at(&self, now: DateTime<Utc>) -> Result<Option<String>, TokenFileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let doc: TokenDoc = serde_json::from_str(&fs::read_to_string(&self.path)?)?;
        if doc.expires_at <= now {
            debug!(expired_at = %doc.expires_at, "stored token expired");
            return Ok(None);
        }
        Ok(non_blank(&doc.token))
    }
}

impl TokenSource for TokenFile {
    /// Unreadable files count as logged out.
    fn token(&self) -> Option<String> {
        self.token_at(Utc::now()).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "could not read token file");
            None
        })
    }
}

fn non_blank(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_treats_blank_as_missing() {
        assert_eq!(StaticToken::new("abc").token().as_deref(), Some("abc"));
        assert_eq!(StaticToken::new("  ").token(), None);
    }

    #[test]
    fn env_token_is_read_at_call_time() {
        let source = EnvToken::new("TODO_CORE_TEST_TOKEN_READ_AT_CALL_TIME");
        std::env::remove_var(source.var());
        assert_eq!(source.token(), None);
        std::env::set_var(source.var(), "fresh");
        assert_eq!(source.token().as_deref(), Some("fresh"));
        std::env::remove_var(source.var());
    }

    #[test]
    fn fallback_asks_second_only_when_first_is_empty() {
        let first = Fallback(StaticToken::new("cli"), StaticToken::new("file"));
        assert_eq!(first.token().as_deref(), Some("cli"));
        let second = Fallback(StaticToken::new(""), StaticToken::new("file"));
        assert_eq!(second.token().as_deref(), Some("file"));
        let neither = Fallback(StaticToken::new(""), StaticToken::new(" "));
        assert_eq!(neither.token(), None);
    }

    #[test]
    fn token_file_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("auth/token.json"));
        assert_eq!(file.token(), None);

        file.store("abc", Utc::now()).unwrap();
        assert_eq!(file.token().as_deref(), Some("abc"));

        assert!(file.clear().unwrap());
        assert!(!file.clear().unwrap());
        assert_eq!(file.token(), None);
    }

    #[test]
    fn token_file_expires_after_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        let issued = Utc::now();
        file.store("abc", issued).unwrap();

        let just_before = issued + Duration::days(TOKEN_LIFETIME_DAYS) - Duration::seconds(1);
        assert_eq!(file.token_at(just_before).unwrap().as_deref(), Some("abc"));
        let at_expiry = issued + Duration::days(TOKEN_LIFETIME_DAYS);
        assert_eq!(file.token_at(at_expiry).unwrap(), None);
    }

    #[test]
    fn corrupt_token_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        let file = TokenFile::new(&path);
        assert!(matches!(file.token_at(Utc::now()), Err(TokenFileError::Json(_))));
        assert_eq!(file.token(), None);
    }
}
