//! Suite runner for the authentication catalog.
//!
//! [`AuthHarness`] owns the transport, the catalog and the per-case result
//! cache. A run fans out over the catalog with at most `concurrency` probes in
//! flight and publishes results in catalog order.
//!
//! Cancellation policy: once the token fires no new probe is issued, and
//! probes already in flight are dropped. Every case still gets a result, so
//! a cancelled run returns a full [`SuiteResult`].
//!
//! # Example
//!
//! ```no_run
//! use authprobe::{AuthHarness, HarnessConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut harness = AuthHarness::new(HarnessConfig::default()).unwrap();
//!     let suite = harness.execute_suite("https://staging.example.com").await.unwrap();
//!
//!     println!("Passed: {}/{}", suite.summary.passed, suite.summary.total);
//! }
//! ```

use crate::auth::{AuthConfig, AuthMethod};
use crate::catalog::{TestCase, basic_test_cases};
use crate::config::HarnessConfig;
use crate::error::{ConfigError, RunnerError};
use crate::models::{CaseResult, ProbeResult, Summary, SuiteResult};
use crate::probe::session::{SessionReport, run_session};
use crate::probe::{ProbeClient, ad_hoc_executor, catalog_executor, until_cancelled};
use crate::validation;
use futures::stream::{self, StreamExt};
use reqwest::Url;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Error message for cases skipped because the run was cancelled first.
pub const CASE_NOT_ISSUED: &str = "Suite cancelled before probe was issued";

/// Lifecycle of a harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotStarted,
    Running,
    Completed,
}

/// Progress callback for suite execution updates.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during suite execution.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A suite run has started.
    SuiteStarted { target: String, total_cases: usize },

    /// A probe is about to be issued for a case.
    CaseStarted { case_id: String },

    /// A case has been probed and evaluated.
    CaseCompleted {
        case_id: String,
        passed: bool,
        duration: Duration,
        result: Box<CaseResult>,
    },

    /// The suite run has completed.
    SuiteCompleted { summary: Summary },
}

/// Runs authentication probes against a target.
pub struct AuthHarness {
    client: ProbeClient,
    cases: Vec<TestCase>,
    filter: Option<String>,
    state: RunState,
    results: HashMap<String, ProbeResult>,
    on_progress: Option<ProgressCallback>,
}

impl AuthHarness {
    /// Creates a harness over the five basic cases.
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: ProbeClient::new(&config)?,
            cases: basic_test_cases(),
            filter: None,
            state: RunState::NotStarted,
            results: HashMap::new(),
            on_progress: None,
        })
    }

    /// Replaces the catalog.
    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.cases = cases;
        self
    }

    /// Only runs cases whose id or name contains `pattern` (case-insensitive).
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Sets a callback for progress updates.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        self.client.config()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the catalog cases selected by the filter, in catalog order.
    pub fn matching_cases(&self) -> Vec<&TestCase> {
        self.cases
            .iter()
            .filter(|case| self.matches_filter(case))
            .collect()
    }

    /// Returns the cached probe result of the last run for a case.
    pub fn get_result(&self, case_id: &str) -> Option<&ProbeResult> {
        self.results.get(case_id)
    }

    /// Drops all cached probe results.
    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    /// Runs the catalog against `target` to completion.
    pub async fn execute_suite(&mut self, target: &str) -> Result<SuiteResult, RunnerError> {
        self.execute_suite_with_cancel(target, &CancellationToken::new())
            .await
    }

    /// Runs the catalog against `target`, stopping early if `cancel` fires.
    ///
    /// Only configuration problems are errors, and they are reported before
    /// any probe is issued.
    pub async fn execute_suite_with_cancel(
        &mut self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<SuiteResult, RunnerError> {
        let target = validate_target_url(target)?;
        let cases: Vec<TestCase> = self.matching_cases().into_iter().cloned().collect();

        if cases.is_empty()
            && let Some(filter) = &self.filter
        {
            return Err(RunnerError::NoMatchingCases(filter.clone()));
        }
        for case in &cases {
            case.auth_config.validate()?;
        }

        let start = Instant::now();
        self.state = RunState::Running;
        info!(
            target = %target,
            cases = cases.len(),
            concurrency = self.config().concurrency,
            "Starting authentication suite"
        );
        self.emit_progress(ProgressEvent::SuiteStarted {
            target: target.clone(),
            total_cases: cases.len(),
        });

        let results: Vec<CaseResult> = {
            let client = &self.client;
            let progress = self.on_progress.as_ref();
            let target = target.as_str();
            stream::iter(cases)
                .map(|case| run_case(client, target, case, cancel, progress))
                .buffered(self.config().concurrency)
                .collect()
                .await
        };

        for case_result in &results {
            self.results.insert(
                case_result.test_case.id.clone(),
                case_result.result.clone(),
            );
        }

        let suite = SuiteResult::from_results(results);
        self.state = RunState::Completed;
        info!(
            passed = suite.summary.passed,
            failed = suite.summary.failed,
            elapsed_ms = start.elapsed().as_millis(),
            cancelled = cancel.is_cancelled(),
            "Authentication suite completed"
        );
        self.emit_progress(ProgressEvent::SuiteCompleted {
            summary: suite.summary,
        });

        Ok(suite)
    }

    /// Runs one probe for a caller-supplied config, outside the catalog.
    ///
    /// The config is validated before any network call.
    pub async fn probe(
        &self,
        target: &str,
        config: &AuthConfig,
    ) -> Result<ProbeResult, ConfigError> {
        let target = validate_target_url(target)?;
        config.validate()?;

        let Some(executor) = ad_hoc_executor(config) else {
            debug!(method = %config.method, "No executor for method");
            return Ok(ProbeResult::unsupported());
        };

        debug!(executor = executor.name(), target = %target, "Running ad-hoc probe");
        let credentials = config.credentials_or_default();
        Ok(executor.execute(&self.client, &target, &credentials).await)
    }

    /// Logs in with `config`, then probes the protected endpoint, optionally
    /// waits `wait` and re-probes it, and finally logs out.
    pub async fn session(
        &self,
        target: &str,
        config: &AuthConfig,
        wait: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<SessionReport, ConfigError> {
        let target = validate_target_url(target)?;
        config.validate()?;
        if config.method != AuthMethod::Login {
            return Err(ConfigError::UnsupportedMethod {
                operation: "session probing",
                required: AuthMethod::Login,
                method: config.method,
            });
        }

        let credentials = config.credentials_or_default();
        Ok(run_session(&self.client, &target, &credentials, wait, cancel).await)
    }

    fn matches_filter(&self, case: &TestCase) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let filter = filter.to_lowercase();
        case.id.to_lowercase().contains(&filter) || case.name.to_lowercase().contains(&filter)
    }

    /// Emits a progress event if a callback is registered.
    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }
}

async fn run_case(
    client: &ProbeClient,
    target: &str,
    case: TestCase,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback>,
) -> CaseResult {
    let start = Instant::now();

    let result = if cancel.is_cancelled() {
        ProbeResult::transport_failure(CASE_NOT_ISSUED, 0)
    } else {
        emit(progress, ProgressEvent::CaseStarted {
            case_id: case.id.clone(),
        });
        match catalog_executor(case.method()) {
            Some(executor) => {
                debug!(case = %case.id, executor = executor.name(), "Probing");
                let credentials = case.auth_config.credentials_or_default();
                until_cancelled(executor.execute(client, target, &credentials), cancel).await
            }
            None => ProbeResult::unsupported(),
        }
    };

    let validation = validation::evaluate(&result, &case);
    info!(
        case = %case.id,
        status = result.status_code,
        passed = validation.passed,
        "Case completed"
    );

    let case_result = CaseResult {
        test_case: case,
        result,
        validation,
    };
    emit(progress, ProgressEvent::CaseCompleted {
        case_id: case_result.test_case.id.clone(),
        passed: case_result.validation.passed,
        duration: start.elapsed(),
        result: Box::new(case_result.clone()),
    });
    case_result
}

fn emit(progress: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = progress {
        callback(event);
    }
}

/// Checks that `target` is a non-empty http(s) URL and returns it trimmed.
pub fn validate_target_url(target: &str) -> Result<String, ConfigError> {
    let trimmed = target.trim();
    let invalid = |reason: &str| ConfigError::InvalidTargetUrl {
        url: target.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let url = Url::parse(trimmed).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::catalog::ExpectedOutcome;
    use crate::validation::Check;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const CLOSED_PORT: &str = "http://127.0.0.1:1";

    fn offline_config() -> HarnessConfig {
        HarnessConfig::default().with_system_proxy(false)
    }

    fn interactive_case(id: &str) -> TestCase {
        TestCase {
            id: id.to_string(),
            name: format!("Interactive {id}"),
            description: "Needs a human".to_string(),
            auth_config: AuthConfig {
                method: AuthMethod::Interactive,
                credentials: None,
            },
            expected_result: ExpectedOutcome::Failure,
            validation_checks: vec![Check::manual("Browser login completes")],
        }
    }

    #[test]
    fn test_validate_target_url() {
        assert_eq!(
            validate_target_url("  https://example.test/app ").unwrap(),
            "https://example.test/app"
        );
        assert!(validate_target_url("").is_err());
        assert!(validate_target_url("   ").is_err());
        assert!(validate_target_url("example.test").is_err());
        assert!(matches!(
            validate_target_url("ftp://example.test"),
            Err(ConfigError::InvalidTargetUrl { .. })
        ));
    }

    #[test]
    fn test_harness_defaults() {
        let harness = AuthHarness::new(offline_config()).unwrap();
        assert_eq!(harness.state(), RunState::NotStarted);
        assert_eq!(harness.matching_cases().len(), 5);
        assert!(harness.get_result("valid-login").is_none());
    }

    #[test]
    fn test_harness_rejects_zero_concurrency() {
        let config = offline_config().with_concurrency(0);
        assert!(AuthHarness::new(config).is_err());
    }

    #[test]
    fn test_matching_cases_with_filter() {
        let harness = AuthHarness::new(offline_config())
            .unwrap()
            .with_filter("TOKEN");
        let ids: Vec<_> = harness
            .matching_cases()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, ["token-auth-valid", "token-auth-invalid"]);
    }

    #[tokio::test]
    async fn test_no_matching_cases_error() {
        let mut harness = AuthHarness::new(offline_config())
            .unwrap()
            .with_filter("nonexistent");
        let err = harness.execute_suite(CLOSED_PORT).await.unwrap_err();
        assert!(matches!(err, RunnerError::NoMatchingCases(f) if f == "nonexistent"));
        assert_eq!(harness.state(), RunState::NotStarted);
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_before_run() {
        let mut harness = AuthHarness::new(offline_config()).unwrap();
        let err = harness.execute_suite("not a url").await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Config(ConfigError::InvalidTargetUrl { .. })
        ));
        assert_eq!(harness.state(), RunState::NotStarted);
    }

    #[tokio::test]
    async fn test_unsupported_methods_need_no_network() {
        let mut harness = AuthHarness::new(offline_config())
            .unwrap()
            .with_cases(vec![interactive_case("a"), interactive_case("b")]);

        // Unroutable target: any network call would fail differently.
        let suite = harness.execute_suite("http://unreachable.invalid").await.unwrap();
        assert_eq!(suite.summary.total, 2);
        for case in &suite.results {
            assert_eq!(
                case.result.error_message.as_deref(),
                Some("Unsupported auth method")
            );
            assert!(case.validation.passed);
        }
        assert_eq!(harness.state(), RunState::Completed);
    }

    #[tokio::test]
    async fn test_closed_port_suite_fails_every_case() {
        let mut harness = AuthHarness::new(offline_config()).unwrap();
        let suite = harness.execute_suite(CLOSED_PORT).await.unwrap();

        assert_eq!(suite.summary.total, 5);
        assert_eq!(suite.summary.passed, 0);
        assert_eq!(suite.summary.failed, 5);
        assert_eq!(suite.summary.success_rate, 0.0);
        assert!(!suite.all_passed());
        assert_eq!(suite.failures().len(), 5);
        for case in &suite.results {
            assert_eq!(case.result.status_code, 0);
        }
    }

    #[tokio::test]
    async fn test_results_cached_and_cleared() {
        let mut harness = AuthHarness::new(offline_config()).unwrap();
        harness.execute_suite(CLOSED_PORT).await.unwrap();

        let cached = harness.get_result("token-auth-invalid").unwrap();
        assert_eq!(cached.status_code, 0);

        harness.clear_results();
        assert!(harness.get_result("token-auth-invalid").is_none());
    }

    #[tokio::test]
    async fn test_pre_cancelled_suite_issues_nothing() {
        let mut harness = AuthHarness::new(offline_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let suite = harness
            .execute_suite_with_cancel(CLOSED_PORT, &cancel)
            .await
            .unwrap();
        assert_eq!(suite.results.len(), 5);
        for case in &suite.results {
            assert_eq!(case.result.error_message.as_deref(), Some(CASE_NOT_ISSUED));
            assert_eq!(case.result.response_time_ms, 0);
        }
    }

    #[tokio::test]
    async fn test_progress_callback() {
        let started = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(Mutex::new(Vec::new()));

        let started_clone = Arc::clone(&started);
        let completed_clone = Arc::clone(&completed);
        let callback: ProgressCallback = Box::new(move |event| match event {
            ProgressEvent::CaseStarted { .. } => {
                started_clone.fetch_add(1, Ordering::SeqCst);
            }
            ProgressEvent::CaseCompleted { case_id, .. } => {
                completed_clone.lock().unwrap().push(case_id);
            }
            _ => {}
        });

        let mut harness = AuthHarness::new(offline_config().with_concurrency(3))
            .unwrap()
            .on_progress(callback);
        harness.execute_suite(CLOSED_PORT).await.unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 5);
        assert_eq!(completed.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_ad_hoc_probe_validates_first() {
        let harness = AuthHarness::new(offline_config()).unwrap();
        let config = AuthConfig {
            method: AuthMethod::Token,
            credentials: None,
        };
        let err = harness.probe(CLOSED_PORT, &config).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { field: "token", .. }));
    }

    #[tokio::test]
    async fn test_ad_hoc_interactive_is_unsupported() {
        let harness = AuthHarness::new(offline_config()).unwrap();
        let config = AuthConfig {
            method: AuthMethod::Interactive,
            credentials: None,
        };
        let result = harness.probe(CLOSED_PORT, &config).await.unwrap();
        assert_eq!(result, ProbeResult::unsupported());
    }

    #[tokio::test]
    async fn test_session_requires_login_method() {
        let harness = AuthHarness::new(offline_config()).unwrap();
        let config =
            AuthConfig::new(AuthMethod::Token, Some(Credentials::token("Bearer x"))).unwrap();
        let err = harness
            .session(CLOSED_PORT, &config, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "session probing requires login authentication, got token"
        );
    }
}
