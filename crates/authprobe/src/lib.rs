//! # authprobe
//!
//! Authentication test harness. Given a target URL, it issues HTTP probes for
//! several authentication strategies, extracts cookies and tokens from the
//! responses, validates each outcome against an expected result, and
//! aggregates pass/fail statistics.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ AuthHarness │────▶│  Executors  │────▶│  Extractor  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │  Reporter   │◀────────────────────────│  Validator  │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - `auth`: authentication methods, credentials and their validation
//! - `config`: harness settings from defaults, YAML, environment and flags
//! - `extract`: cookie and token extraction from raw responses
//! - `probe`: the HTTP transport and one executor per method
//! - `validation`: named checks and the aggregate verdict
//! - `catalog`: the fixed set of authentication scenarios
//! - `runner`: suite orchestration, cancellation and the result cache
//! - `reporter`: terminal output

pub use crate::auth::{AuthConfig, AuthMethod, Credentials};
pub use crate::catalog::{ExpectedOutcome, TestCase, basic_test_cases};
pub use crate::config::HarnessConfig;
pub use crate::error::{ConfigError, RunnerError};
pub use crate::models::{AuthTokens, CaseResult, Cookies, Headers, ProbeResult, Summary, SuiteResult};
pub use crate::probe::session::SessionReport;
pub use crate::probe::{
    BearerTokenProbe, CookieReplayProbe, CustomHeaderProbe, Executor, FormLoginProbe, ProbeClient,
};
pub use crate::reporter::{TerminalReporter, Verbosity, create_progress_callback};
pub use crate::runner::{AuthHarness, ProgressCallback, ProgressEvent, RunState};
pub use crate::validation::{Check, CheckOutcome, Validation};

pub mod auth;
pub mod catalog;
pub mod config;
mod error;
pub mod extract;
mod models;
pub mod probe;
pub mod reporter;
pub mod runner;
pub mod validation;

/// Library version, matching the crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
