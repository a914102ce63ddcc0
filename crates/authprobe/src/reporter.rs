//! Terminal output for suite runs and single probes.
//!
//! # Example
//!
//! ```no_run
//! use authprobe::{ProgressEvent, SuiteResult, TerminalReporter};
//!
//! let mut reporter = TerminalReporter::new();
//! reporter.handle_progress(ProgressEvent::SuiteStarted {
//!     target: "https://example.test".to_string(),
//!     total_cases: 5,
//! });
//! reporter.print_summary(&SuiteResult::default());
//! ```

use crate::catalog::{ExpectedOutcome, TestCase};
use crate::models::{CaseResult, ProbeResult, SuiteResult};
use crate::probe::session::SessionReport;
use crate::runner::{ProgressCallback, ProgressEvent};
use colored::{ColoredString, Colorize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Verbosity level for terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Show only the pass/fail summary.
    Quiet,
    /// Normal output with per-case progress.
    #[default]
    Normal,
    /// Per-check verdicts and response details.
    Verbose,
}

/// Terminal reporter for authentication suite results.
#[derive(Debug, Default)]
pub struct TerminalReporter {
    verbosity: Verbosity,
}

impl TerminalReporter {
    /// Creates a new terminal reporter with normal verbosity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter with the specified verbosity.
    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Handles a progress event, printing appropriate output.
    pub fn handle_progress(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::SuiteStarted {
                target,
                total_cases,
            } => {
                if self.verbosity != Verbosity::Quiet {
                    println!(
                        "\n{}\n",
                        format!(
                            "Probing {} with {} case{}...",
                            target,
                            total_cases,
                            if total_cases == 1 { "" } else { "s" }
                        )
                        .bold()
                    );
                }
            }
            ProgressEvent::CaseStarted { case_id } => {
                if self.verbosity == Verbosity::Verbose {
                    println!("  {} {}", "→".dimmed(), case_id.dimmed());
                }
            }
            ProgressEvent::CaseCompleted {
                case_id,
                passed,
                duration,
                result,
            } => {
                if self.verbosity != Verbosity::Quiet {
                    self.print_case_completed(&case_id, passed, duration, &result);
                }
            }
            ProgressEvent::SuiteCompleted { .. } => {}
        }
    }

    fn print_case_completed(
        &self,
        case_id: &str,
        passed: bool,
        duration: Duration,
        result: &CaseResult,
    ) {
        let mark = if passed { "✓".green() } else { "✗".red() };
        let status = status_label(&result.result);
        let duration = format!("({}ms)", duration.as_millis()).dimmed();
        println!("  {mark} {case_id} {status} {duration}");

        if self.verbosity == Verbosity::Verbose {
            for outcome in &result.validation.validation_results {
                let check = if outcome.passed {
                    "└─ ✓".green()
                } else {
                    "└─ ✗".red()
                };
                println!("     {} {} {}", check, outcome.check, outcome.details.dimmed());
            }
        }
    }

    /// Prints the overall verdict and counts.
    pub fn print_summary(&self, suite: &SuiteResult) {
        let summary = &suite.summary;

        if self.verbosity == Verbosity::Quiet {
            if summary.failed == 0 {
                println!("{}", format!("✓ {}/{} passed", summary.passed, summary.total).green());
            } else {
                println!("{}", format!("✗ {}/{} failed", summary.failed, summary.total).red());
            }
            return;
        }

        println!("\n{}", "━".repeat(40).dimmed());

        let (verdict, color) = if summary.failed == 0 {
            ("PASSED", colored::Color::Green)
        } else if summary.passed > 0 {
            ("MIXED", colored::Color::Yellow)
        } else {
            ("FAILED", colored::Color::Red)
        };

        let verdict_text = format!("{}: {} of {} cases", verdict, summary.passed, summary.total);
        println!("{}", verdict_text.color(color).bold());
        println!(
            "   {}, {}, {}",
            format!("{} passed", summary.passed).green(),
            format!("{} failed", summary.failed).red(),
            format!("{:.1}% success rate", summary.success_rate).dimmed()
        );
    }

    /// Prints failed checks for every failed case.
    pub fn print_failures(&self, suite: &SuiteResult) {
        let failures = suite.failures();
        if failures.is_empty() {
            return;
        }

        println!("\n{}\n", "Failed Cases:".red().bold());
        for case in failures {
            println!("  {} {}", "✗".red(), case.test_case.id.red().bold());
            println!("     {}", case.test_case.description.dimmed());
            if let Some(message) = &case.result.error_message {
                println!("     Error: {}", message.red());
            }
            println!(
                "     Expected: {}   Actual success: {}",
                expected_label(case.test_case.expected_result),
                case.result.success
            );
            for outcome in case.validation.failed_checks() {
                println!("     {} {} ({})", "✗".red(), outcome.check, outcome.details);
            }
            println!();
        }
    }

    /// Prints a single probe result.
    pub fn print_probe(&self, label: &str, result: &ProbeResult) {
        let mark = if result.success { "✓".green() } else { "✗".red() };
        println!(
            "{} {} {} {}",
            mark,
            label.bold(),
            status_label(result),
            format!("({}ms)", result.response_time_ms).dimmed()
        );

        if let Some(message) = &result.error_message {
            println!("   Error: {}", message.red());
        }
        if let Some(redirect) = &result.redirect_url {
            println!("   Redirected to: {redirect}");
        }
        if !result.cookies.is_empty() {
            let names: Vec<&str> = result.cookies.keys().map(String::as_str).collect();
            println!("   Cookies: {}", names.join(", "));
        }
        if let Some(tokens) = &result.auth_tokens {
            let found: Vec<&str> = [
                ("session", tokens.session_token.is_some()),
                ("jwt", tokens.jwt_token.is_some()),
                ("csrf", tokens.csrf_token.is_some()),
            ]
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect();
            println!("   Tokens: {}", found.join(", "));
        }
        if self.verbosity == Verbosity::Verbose {
            for (name, value) in result.headers.iter() {
                println!("   {}: {}", name.dimmed(), value);
            }
        }
    }

    /// Prints every step of a session sequence.
    pub fn print_session(&self, report: &SessionReport) {
        for (label, result) in report.steps() {
            self.print_probe(label, result);
        }
    }

    /// Prints the catalog.
    pub fn print_catalog(&self, cases: &[TestCase]) {
        for case in cases {
            println!(
                "{} {} {}",
                case.id.bold(),
                format!("[{}]", case.method()).dimmed(),
                format!("expects {}", case.expected_result).dimmed()
            );
            println!("   {}", case.name);
            for check in &case.validation_checks {
                let kind = if check.is_manual() { "manual" } else { "auto" };
                println!("   {} {} {}", "•".dimmed(), check, format!("({kind})").dimmed());
            }
        }
    }
}

fn expected_label(expected: ExpectedOutcome) -> ColoredString {
    match expected {
        ExpectedOutcome::Success => expected.to_string().green(),
        ExpectedOutcome::Failure => expected.to_string().yellow(),
    }
}

fn status_label(result: &ProbeResult) -> String {
    if result.completed() {
        format!("HTTP {}", result.status_code)
    } else {
        "no response".to_string()
    }
}

/// Creates a progress callback for use with [`AuthHarness`](crate::AuthHarness).
pub fn create_progress_callback(verbosity: Verbosity) -> ProgressCallback {
    let reporter = Arc::new(Mutex::new(TerminalReporter::with_verbosity(verbosity)));

    Box::new(move |event| {
        if let Ok(mut r) = reporter.lock() {
            r.handle_progress(event);
        }
    })
}
