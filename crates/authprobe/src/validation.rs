//! Validation rules applied to probe results.
//!
//! Checks form a closed set. Names that cannot be verified mechanically are
//! modelled explicitly as [`Check::Manual`]; an unknown name is rejected when
//! the check is parsed, so a typo can never turn into a silent pass.

use crate::catalog::{ExpectedOutcome, TestCase};
use crate::error::ConfigError;
use crate::models::{Cookies, ProbeResult};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MANUAL_DETAILS: &str = "Manual verification required";

/// A named assertion about a probe result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Check {
    /// `Status code is 200 or 302`
    StatusOkOrFound,
    /// `Status code is 200`
    StatusOk,
    /// `Status code is 401 or 403`
    StatusUnauthorizedOrForbidden,
    /// `Status code is 401`
    StatusUnauthorized,
    /// `Session cookie is set`
    SessionCookieSet,
    /// `Authorization header accepted`
    AuthorizationAccepted,
    /// `WWW-Authenticate header present`
    WwwAuthenticatePresent,
    /// `No session cookie is set`
    NoSessionCookie,
    /// A check a human has to confirm; always passes.
    Manual(String),
}

impl Check {
    /// Every mechanically evaluated check.
    pub const AUTOMATIC: [Check; 8] = [
        Check::StatusOkOrFound,
        Check::StatusOk,
        Check::StatusUnauthorizedOrForbidden,
        Check::StatusUnauthorized,
        Check::SessionCookieSet,
        Check::AuthorizationAccepted,
        Check::WwwAuthenticatePresent,
        Check::NoSessionCookie,
    ];

    /// Creates a manual check with a free-form label.
    pub fn manual(label: impl Into<String>) -> Self {
        Check::Manual(label.into())
    }

    /// The display name of the check.
    pub fn name(&self) -> &str {
        match self {
            Check::StatusOkOrFound => "Status code is 200 or 302",
            Check::StatusOk => "Status code is 200",
            Check::StatusUnauthorizedOrForbidden => "Status code is 401 or 403",
            Check::StatusUnauthorized => "Status code is 401",
            Check::SessionCookieSet => "Session cookie is set",
            Check::AuthorizationAccepted => "Authorization header accepted",
            Check::WwwAuthenticatePresent => "WWW-Authenticate header present",
            Check::NoSessionCookie => "No session cookie is set",
            Check::Manual(label) => label,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Check::Manual(_))
    }

    /// Evaluates the check against a probe result.
    pub fn evaluate(&self, result: &ProbeResult) -> CheckOutcome {
        let (passed, details) = match self {
            Check::StatusOkOrFound => (
                matches!(result.status_code, 200 | 302),
                status_details(result),
            ),
            Check::StatusOk => (result.status_code == 200, status_details(result)),
            Check::StatusUnauthorizedOrForbidden => (
                matches!(result.status_code, 401 | 403),
                status_details(result),
            ),
            Check::StatusUnauthorized => (result.status_code == 401, status_details(result)),
            Check::SessionCookieSet => (
                any_cookie_contains(&result.cookies, &["session", "auth", "token"]),
                format!("Cookies found: {}", cookie_names(&result.cookies)),
            ),
            Check::AuthorizationAccepted => (
                result.success && result.status_code == 200,
                format!("Request successful: {}", result.success),
            ),
            Check::WwwAuthenticatePresent => {
                let value = result.headers.get("www-authenticate");
                (
                    value.is_some(),
                    format!("WWW-Authenticate: {}", value.unwrap_or("Not present")),
                )
            }
            Check::NoSessionCookie => {
                let names = cookie_names(&result.cookies);
                (
                    !any_cookie_contains(&result.cookies, &["session", "auth"]),
                    format!(
                        "Cookies: {}",
                        if names.is_empty() { "None" } else { names.as_str() }
                    ),
                )
            }
            Check::Manual(_) => (true, MANUAL_DETAILS.to_string()),
        };

        CheckOutcome {
            check: self.name().to_string(),
            passed,
            details,
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Entry point for check names that arrive as text, such as a case list
/// read from a file. A misspelled name is rejected with
/// [`ConfigError::UnknownCheck`] instead of silently becoming manual; manual
/// checks must be built with [`Check::manual`].
///
/// ```
/// use authprobe::Check;
///
/// let check: Check = "Status code is 401".parse().unwrap();
/// assert_eq!(check, Check::StatusUnauthorized);
/// assert!("Status code is 4O1".parse::<Check>().is_err());
/// ```
impl FromStr for Check {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Check::AUTOMATIC
            .iter()
            .find(|check| check.name() == s)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownCheck(s.to_string()))
    }
}

impl Serialize for Check {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Verdict for one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub check: String,
    pub passed: bool,
    pub details: String,
}

/// Aggregate verdict for a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// All checks passed and the probe outcome matched the expectation.
    pub passed: bool,
    pub validation_results: Vec<CheckOutcome>,
}

impl Validation {
    /// Returns the outcomes of checks that failed.
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.validation_results.iter().filter(|o| !o.passed)
    }
}

/// Evaluates every check of `test_case` against `result`, in order.
pub fn evaluate(result: &ProbeResult, test_case: &TestCase) -> Validation {
    let validation_results: Vec<CheckOutcome> = test_case
        .validation_checks
        .iter()
        .map(|check| check.evaluate(result))
        .collect();

    let all_passed = validation_results.iter().all(|outcome| outcome.passed);
    let expected_success = test_case.expected_result == ExpectedOutcome::Success;

    Validation {
        passed: all_passed && expected_success == result.success,
        validation_results,
    }
}

fn status_details(result: &ProbeResult) -> String {
    format!("Actual status: {}", result.status_code)
}

fn any_cookie_contains(cookies: &Cookies, needles: &[&str]) -> bool {
    cookies.keys().any(|name| {
        let lower = name.to_lowercase();
        needles.iter().any(|needle| lower.contains(needle))
    })
}

fn cookie_names(cookies: &Cookies) -> String {
    cookies.keys().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::models::Headers;

    fn probe(status: u16) -> ProbeResult {
        ProbeResult {
            success: (200..300).contains(&status),
            status_code: status,
            ..ProbeResult::default()
        }
    }

    fn case(expected: ExpectedOutcome, checks: Vec<Check>) -> TestCase {
        TestCase {
            id: "case".to_string(),
            name: "Case".to_string(),
            description: "A case".to_string(),
            auth_config: AuthConfig::none(),
            expected_result: expected,
            validation_checks: checks,
        }
    }

    #[test]
    fn test_parse_known_names() {
        for check in Check::AUTOMATIC {
            assert_eq!(check.name().parse::<Check>().unwrap(), check);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_misspelled() {
        let err = "Status code is 200 or 301".parse::<Check>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCheck(name) if name == "Status code is 200 or 301"));
        assert!("status code is 200".parse::<Check>().is_err());
    }

    #[test]
    fn test_status_ok_or_found() {
        let outcome = Check::StatusOkOrFound.evaluate(&probe(200));
        assert!(outcome.passed);
        assert_eq!(outcome.details, "Actual status: 200");
        assert!(Check::StatusOkOrFound.evaluate(&probe(302)).passed);
        assert!(!Check::StatusOkOrFound.evaluate(&probe(301)).passed);
    }

    #[test]
    fn test_status_checks_on_transport_failure() {
        let failed = ProbeResult::transport_failure("refused", 3);
        for check in [
            Check::StatusOkOrFound,
            Check::StatusOk,
            Check::StatusUnauthorizedOrForbidden,
            Check::StatusUnauthorized,
        ] {
            let outcome = check.evaluate(&failed);
            assert!(!outcome.passed, "{check}");
            assert_eq!(outcome.details, "Actual status: 0");
        }
    }

    #[test]
    fn test_unauthorized_variants() {
        assert!(Check::StatusUnauthorizedOrForbidden.evaluate(&probe(403)).passed);
        assert!(!Check::StatusUnauthorized.evaluate(&probe(403)).passed);
        assert!(Check::StatusUnauthorized.evaluate(&probe(401)).passed);
    }

    #[test]
    fn test_session_cookie_set() {
        let mut result = probe(200);
        result
            .cookies
            .insert("AUTH_TOKEN".to_string(), "v".to_string());
        let outcome = Check::SessionCookieSet.evaluate(&result);
        assert!(outcome.passed);
        assert_eq!(outcome.details, "Cookies found: AUTH_TOKEN");

        let mut result = probe(200);
        result.cookies.insert("theme".to_string(), "dark".to_string());
        assert!(!Check::SessionCookieSet.evaluate(&result).passed);
    }

    #[test]
    fn test_no_session_cookie() {
        let outcome = Check::NoSessionCookie.evaluate(&probe(401));
        assert!(outcome.passed);
        assert_eq!(outcome.details, "Cookies: None");

        let mut result = probe(401);
        result
            .cookies
            .insert("PHPSESSID".to_string(), "x".to_string());
        assert!(!Check::NoSessionCookie.evaluate(&result).passed);

        // "token" alone does not count as a session cookie here.
        let mut result = probe(401);
        result.cookies.insert("token".to_string(), "x".to_string());
        assert!(Check::NoSessionCookie.evaluate(&result).passed);
    }

    #[test]
    fn test_authorization_accepted() {
        assert!(Check::AuthorizationAccepted.evaluate(&probe(200)).passed);
        let outcome = Check::AuthorizationAccepted.evaluate(&probe(204));
        assert!(!outcome.passed);
        assert_eq!(outcome.details, "Request successful: true");
    }

    #[test]
    fn test_www_authenticate_present() {
        let mut result = probe(401);
        result.headers = Headers::from_iter([("WWW-Authenticate", "Bearer")]);
        let outcome = Check::WwwAuthenticatePresent.evaluate(&result);
        assert!(outcome.passed);
        assert_eq!(outcome.details, "WWW-Authenticate: Bearer");

        let outcome = Check::WwwAuthenticatePresent.evaluate(&probe(401));
        assert!(!outcome.passed);
        assert_eq!(outcome.details, "WWW-Authenticate: Not present");
    }

    #[test]
    fn test_manual_check_always_passes() {
        let outcome = Check::manual("Remains on login page").evaluate(&probe(0));
        assert!(outcome.passed);
        assert_eq!(outcome.check, "Remains on login page");
        assert_eq!(outcome.details, "Manual verification required");
    }

    #[test]
    fn test_aggregate_requires_expected_outcome() {
        let test_case = case(ExpectedOutcome::Failure, vec![Check::StatusOk]);
        let validation = evaluate(&probe(200), &test_case);
        assert!(validation.validation_results[0].passed);
        assert!(!validation.passed);
    }

    #[test]
    fn test_aggregate_requires_every_check() {
        let test_case = case(
            ExpectedOutcome::Success,
            vec![Check::StatusOk, Check::SessionCookieSet],
        );
        let validation = evaluate(&probe(200), &test_case);
        assert!(!validation.passed);
        assert_eq!(validation.failed_checks().count(), 1);
    }

    #[test]
    fn test_aggregate_preserves_check_order() {
        let test_case = case(
            ExpectedOutcome::Failure,
            vec![
                Check::StatusUnauthorized,
                Check::manual("Error response with token validation message"),
                Check::NoSessionCookie,
            ],
        );
        let validation = evaluate(&probe(401), &test_case);
        assert!(validation.passed);
        let names: Vec<_> = validation
            .validation_results
            .iter()
            .map(|o| o.check.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "Status code is 401",
                "Error response with token validation message",
                "No session cookie is set"
            ]
        );
    }

    #[test]
    fn test_check_serializes_as_name() {
        let json = serde_json::to_value(vec![Check::StatusOk, Check::manual("Look at it")]).unwrap();
        assert_eq!(json, serde_json::json!(["Status code is 200", "Look at it"]));
    }
}
