//! The fixed catalog of authentication scenarios.
//!
//! Each case binds an [`AuthConfig`] to the outcome it should produce and the
//! checks that confirm it. The credential payloads are illustrative: they are
//! what a well-behaved target is expected to accept or reject.

use crate::auth::{AuthConfig, AuthMethod, Credentials};
use crate::validation::Check;
use serde::Serialize;
use std::fmt;

/// Whether a case should authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedOutcome {
    Success,
    Failure,
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedOutcome::Success => write!(f, "success"),
            ExpectedOutcome::Failure => write!(f, "failure"),
        }
    }
}

/// A single catalog scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub auth_config: AuthConfig,
    pub expected_result: ExpectedOutcome,
    /// Checks evaluated in this order.
    pub validation_checks: Vec<Check>,
}

impl TestCase {
    pub fn method(&self) -> AuthMethod {
        self.auth_config.method
    }
}

/// Returns the five basic authentication cases in execution order.
pub fn basic_test_cases() -> Vec<TestCase> {
    vec![
        TestCase {
            id: "valid-login".to_string(),
            name: "Valid Username/Password Login".to_string(),
            description: "Test successful login with correct credentials".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Login,
                credentials: Some(Credentials::login(
                    "testuser@example.com",
                    "validPassword123",
                )),
            },
            expected_result: ExpectedOutcome::Success,
            validation_checks: vec![
                Check::StatusOkOrFound,
                Check::SessionCookieSet,
                Check::manual("Redirect to authenticated area"),
                Check::manual("No error messages in response"),
            ],
        },
        TestCase {
            id: "invalid-credentials".to_string(),
            name: "Invalid Credentials".to_string(),
            description: "Test login failure with incorrect credentials".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Login,
                credentials: Some(Credentials::login("testuser@example.com", "wrongPassword")),
            },
            expected_result: ExpectedOutcome::Failure,
            validation_checks: vec![
                Check::StatusUnauthorizedOrForbidden,
                Check::manual("Error message is displayed"),
                Check::NoSessionCookie,
                Check::manual("Remains on login page"),
            ],
        },
        TestCase {
            id: "empty-credentials".to_string(),
            name: "Empty Credentials".to_string(),
            description: "Test validation with empty username/password".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Login,
                credentials: Some(Credentials::login("", "")),
            },
            expected_result: ExpectedOutcome::Failure,
            validation_checks: vec![
                Check::manual("Status code is 400 or 422"),
                Check::manual("Validation error messages shown"),
                Check::manual("Form validation prevents submission"),
                Check::manual("Required field indicators present"),
            ],
        },
        TestCase {
            id: "token-auth-valid".to_string(),
            name: "Valid Token Authentication".to_string(),
            description: "Test API access with valid Bearer token".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Token,
                credentials: Some(Credentials::token(
                    "Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.validtoken",
                )),
            },
            expected_result: ExpectedOutcome::Success,
            validation_checks: vec![
                Check::StatusOk,
                Check::AuthorizationAccepted,
                Check::manual("Protected content accessible"),
                Check::manual("Valid JSON response"),
            ],
        },
        TestCase {
            id: "token-auth-invalid".to_string(),
            name: "Invalid Token Authentication".to_string(),
            description: "Test API access with invalid/expired token".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Token,
                credentials: Some(Credentials::token("Bearer invalid.token.here")),
            },
            expected_result: ExpectedOutcome::Failure,
            validation_checks: vec![
                Check::StatusUnauthorized,
                Check::WwwAuthenticatePresent,
                Check::manual("Error response with token validation message"),
                Check::manual("No access to protected resources"),
            ],
        },
    ]
}

/// Looks up a catalog case by id.
pub fn find_case(id: &str) -> Option<TestCase> {
    basic_test_cases().into_iter().find(|case| case.id == id)
}
