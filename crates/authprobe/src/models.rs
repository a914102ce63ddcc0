//! Data models for the authentication harness.
//!
//! This module defines the structures handed back to callers: the outcome of
//! a single probe, the artifacts pulled out of it, and the aggregated suite
//! result. Field names serialize in camelCase.

use crate::catalog::TestCase;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cookie name to value.
pub type Cookies = BTreeMap<String, String>;

/// Response headers keyed by lowercase name.
///
/// Lookups are case-insensitive; iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any value stored under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Appends a value, joining repeats with `", "`.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let key = name.as_ref().to_ascii_lowercase();
        match self.0.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value.as_ref());
            }
            None => {
                self.0.insert(key, value.as_ref().to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Authentication artifacts found in a response.
///
/// Only ever constructed with at least one field set; "nothing found" is
/// represented by `None` at the use site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl AuthTokens {
    pub fn is_empty(&self) -> bool {
        self.session_token.is_none() && self.jwt_token.is_none() && self.csrf_token.is_none()
    }
}

/// Outcome of one HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// True iff the exchange completed with a 2xx status.
    pub success: bool,
    /// HTTP status, or 0 when the exchange never completed.
    pub status_code: u16,
    pub response_time_ms: u64,
    pub headers: Headers,
    pub cookies: Cookies,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_tokens: Option<AuthTokens>,
}

impl ProbeResult {
    /// A probe whose exchange never completed (DNS, connect, timeout, cancel).
    pub fn transport_failure(message: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            success: false,
            status_code: 0,
            response_time_ms,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Synthetic result for a method the harness cannot drive automatically.
    pub fn unsupported() -> Self {
        Self::transport_failure("Unsupported auth method", 0)
    }

    /// True when the exchange completed, whatever the status.
    pub fn completed(&self) -> bool {
        self.status_code != 0
    }
}

/// Pass/fail counts for a suite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// `passed / total * 100`, or 0 for an empty suite.
    pub success_rate: f64,
}

impl Summary {
    /// Computes the summary from per-case verdicts.
    pub fn from_verdicts(verdicts: impl IntoIterator<Item = bool>) -> Self {
        let (total, passed) = verdicts
            .into_iter()
            .fold((0usize, 0usize), |(total, passed), ok| {
                (total + 1, passed + usize::from(ok))
            });
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            passed,
            failed: total - passed,
            success_rate,
        }
    }
}

/// One executed catalog case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub test_case: TestCase,
    pub result: ProbeResult,
    pub validation: Validation,
}

/// Complete output of a suite run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub summary: Summary,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    /// Builds the result and its summary from executed cases.
    pub fn from_results(results: Vec<CaseResult>) -> Self {
        let summary = Summary::from_verdicts(results.iter().map(|r| r.validation.passed));
        Self { summary, results }
    }

    /// Returns true if every case passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.validation.passed)
    }

    /// Returns only failed cases.
    pub fn failures(&self) -> Vec<&CaseResult> {
        self.results
            .iter()
            .filter(|r| !r.validation.passed)
            .collect()
    }
}
