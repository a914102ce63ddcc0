//! Authentication strategy model.
//!
//! An [`AuthConfig`] pairs an [`AuthMethod`] with the [`Credentials`] it needs.
//! Whether the credentials fit the method is checked when the config is
//! built, never at probe time.
//!
//! # Example
//!
//! ```
//! use authprobe::auth::{AuthConfig, AuthMethod, Credentials};
//!
//! let config = AuthConfig::new(
//!     AuthMethod::Token,
//!     Some(Credentials::default().with_token("Bearer abc123")),
//! )
//! .unwrap();
//! assert_eq!(config.method, AuthMethod::Token);
//!
//! let missing = AuthConfig::new(AuthMethod::Login, None);
//! assert!(missing.is_err());
//! ```

use crate::error::{ConfigError, Result};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported authentication strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Public target, optional headers/cookies only.
    #[default]
    None,
    /// Authorization header token.
    Token,
    /// Username/password form login.
    Login,
    /// Manual browser login, never executed automatically.
    Interactive,
}

impl AuthMethod {
    /// Returns all methods in display order.
    pub fn all() -> &'static [AuthMethod] {
        &[
            AuthMethod::None,
            AuthMethod::Token,
            AuthMethod::Login,
            AuthMethod::Interactive,
        ]
    }

    /// Returns the lowercase wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Token => "token",
            AuthMethod::Login => "login",
            AuthMethod::Interactive => "interactive",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AuthMethod::all()
            .iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown auth method: {s}"))
    }
}

/// Credential material for a probe. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Extra request headers. Names are matched case-insensitively on send.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Cookies to replay, keyed by cookie name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
}

impl Credentials {
    /// Creates username/password credentials.
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Creates token-only credentials.
    pub fn token(token: impl Into<String>) -> Self {
        Self::default().with_token(token)
    }

    /// Sets the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Adds a single header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a single cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Merges headers parsed from a JSON object such as `{"X-Api-Key": "k"}`.
    pub fn with_headers_json(mut self, json: &str) -> Result<Self> {
        self.headers.extend(parse_json_map("headers", json)?);
        Ok(self)
    }

    /// Merges cookies parsed from a JSON object such as `{"sessionId": "abc"}`.
    pub fn with_cookies_json(mut self, json: &str) -> Result<Self> {
        self.cookies.extend(parse_json_map("cookies", json)?);
        Ok(self)
    }

    /// Checks that every supplied header can be put on the wire.
    pub fn validate_headers(&self) -> Result<()> {
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: err.to_string(),
            })?;
            HeaderValue::from_str(value).map_err(|err| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

/// An authentication strategy and its credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub method: AuthMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl AuthConfig {
    /// Builds a validated config.
    pub fn new(method: AuthMethod, credentials: Option<Credentials>) -> Result<Self> {
        let config = Self {
            method,
            credentials,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config for an unauthenticated target.
    pub fn none() -> Self {
        Self::default()
    }

    /// Checks that the credentials suit the method.
    ///
    /// `login` needs both fields present (empty strings are allowed so the
    /// empty-credentials scenario stays expressible); `token` needs a
    /// non-blank token.
    pub fn validate(&self) -> Result<()> {
        let credentials = self.credentials.as_ref();

        match self.method {
            AuthMethod::Login => {
                let creds = credentials.ok_or(ConfigError::MissingCredential {
                    method: self.method,
                    field: "credentials",
                })?;
                if creds.username.is_none() {
                    return Err(ConfigError::MissingCredential {
                        method: self.method,
                        field: "username",
                    });
                }
                if creds.password.is_none() {
                    return Err(ConfigError::MissingCredential {
                        method: self.method,
                        field: "password",
                    });
                }
            }
            AuthMethod::Token => {
                let token = credentials.and_then(|creds| creds.token.as_deref());
                let Some(token) = token.filter(|token| !token.trim().is_empty()) else {
                    return Err(ConfigError::MissingCredential {
                        method: self.method,
                        field: "token",
                    });
                };
                HeaderValue::from_str(token).map_err(|err| ConfigError::InvalidHeader {
                    name: "Authorization".to_string(),
                    reason: err.to_string(),
                })?;
            }
            AuthMethod::None | AuthMethod::Interactive => {}
        }

        if let Some(creds) = credentials {
            creds.validate_headers()?;
        }
        Ok(())
    }

    /// Returns the credentials, or an empty set when none were supplied.
    pub fn credentials_or_default(&self) -> Credentials {
        self.credentials.clone().unwrap_or_default()
    }
}

fn parse_json_map(field: &'static str, json: &str) -> Result<BTreeMap<String, String>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(trimmed).map_err(|source| ConfigError::InvalidJson { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_method_round_trips_through_str() {
        for method in AuthMethod::all() {
            assert_eq!(method.as_str().parse::<AuthMethod>().unwrap(), *method);
        }
        assert_eq!("LOGIN".parse::<AuthMethod>().unwrap(), AuthMethod::Login);
        assert!("oauth".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn test_login_requires_username_and_password() {
        let err = AuthConfig::new(AuthMethod::Login, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential {
                field: "credentials",
                ..
            }
        ));

        let creds = Credentials {
            username: Some("user".to_string()),
            ..Credentials::default()
        };
        let err = AuthConfig::new(AuthMethod::Login, Some(creds)).unwrap_err();
        assert_eq!(err.to_string(), "password is required for login authentication");
    }

    #[test]
    fn test_login_accepts_empty_strings() {
        let config = AuthConfig::new(AuthMethod::Login, Some(Credentials::login("", "")));
        assert!(config.is_ok());
    }

    #[test]
    fn test_token_rejects_blank_token() {
        let err = AuthConfig::new(AuthMethod::Token, Some(Credentials::token("   "))).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential { field: "token", .. }
        ));
    }

    #[test]
    fn test_token_must_be_a_valid_header_value() {
        let err = AuthConfig::new(AuthMethod::Token, Some(Credentials::token("Bearer a\nb")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { name, .. } if name == "Authorization"));
    }

    #[test]
    fn test_none_and_interactive_need_nothing() {
        assert!(AuthConfig::new(AuthMethod::None, None).is_ok());
        assert!(AuthConfig::new(AuthMethod::Interactive, None).is_ok());
    }

    #[test]
    fn test_headers_json_parsing() {
        let creds = Credentials::default()
            .with_headers_json(r#"{"X-Api-Key": "key456", "User-Agent": "MyApp/1.0"}"#)
            .unwrap();
        assert_eq!(creds.headers.get("X-Api-Key").unwrap(), "key456");
        assert_eq!(creds.headers.len(), 2);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = Credentials::default()
            .with_cookies_json("{sessionId: abc}")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { field: "cookies", .. }));

        let err = Credentials::default()
            .with_headers_json(r#"["not", "an", "object"]"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { field: "headers", .. }));
    }

    #[test]
    fn test_blank_json_is_empty_map() {
        let creds = Credentials::default().with_cookies_json("  ").unwrap();
        assert!(creds.cookies.is_empty());
    }

    #[test]
    fn test_invalid_header_name_is_config_error() {
        let creds = Credentials::default().with_header("Bad Header", "v");
        let err = AuthConfig::new(AuthMethod::None, Some(creds)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { .. }));
    }

    #[test]
    fn test_auth_config_serializes_camel_case() {
        let config = AuthConfig::new(AuthMethod::Token, Some(Credentials::token("Bearer x"))).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["method"], "token");
        assert_eq!(json["credentials"]["token"], "Bearer x");
        assert!(json["credentials"].get("headers").is_none());
    }
}
