//! Client configuration read from the environment.

use crate::client::TodoClient;
use crate::token::EnvToken;

pub const DEFAULT_BASE_URL: &str = "http://todoo.runasp.net/api";
pub const DEFAULT_TOKEN_VAR: &str = "TODO_API_TOKEN";

pub const BASE_URL_VAR: &str = "TODO_API_BASE_URL";
pub const TOKEN_VAR_VAR: &str = "TODO_API_TOKEN_VAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root; the todo endpoint is `{base_url}/todo`.
    pub base_url: String,
    /// Environment variable the bearer token is read from.
    pub token_var: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_var: DEFAULT_TOKEN_VAR.to_string(),
        }
    }
}

impl ClientConfig {
    /// `TODO_API_BASE_URL` and `TODO_API_TOKEN_VAR`, each falling back to its
    /// default when unset or blank.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            base_url: get(BASE_URL_VAR, DEFAULT_BASE_URL),
            token_var: get(TOKEN_VAR_VAR, DEFAULT_TOKEN_VAR),
        }
    }

    pub fn client(&self) -> TodoClient {
        TodoClient::new(&self.base_url)
    }

    pub fn token_source(&self) -> EnvToken {
        EnvToken::new(&self.token_var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.client().base_url(), "http://todoo.runasp.net/api");
    }

    #[test]
    fn reads_overrides_and_ignores_blank() {
        let config = ClientConfig::from_lookup(|key| match key {
            BASE_URL_VAR => Some("http://localhost:3000/api/".to_string()),
            TOKEN_VAR_VAR => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.client().base_url(), "http://localhost:3000/api");
        assert_eq!(config.token_var, DEFAULT_TOKEN_VAR);
        assert_eq!(config.token_source().var(), DEFAULT_TOKEN_VAR);
    }
}
