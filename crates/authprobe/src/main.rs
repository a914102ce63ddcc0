//! # authprobe
//!
//! Command-line front end for the authentication test harness.
//!
//! ## Usage
//!
//! ```bash
//! # Run the five-case catalog
//! authprobe suite https://staging.example.com
//!
//! # Probe once with a bearer token
//! authprobe probe https://api.example.com --method token --token "Bearer abc"
//!
//! # Login, hit the protected endpoint, then log out
//! authprobe session https://app.example.com --username me --password secret
//!
//! # Show the catalog
//! authprobe list
//! ```

use anyhow::{Context, Result};
use authprobe::{
    AuthConfig, AuthHarness, AuthMethod as LibAuthMethod, ConfigError, Credentials, HarnessConfig,
    RunnerError, TerminalReporter, Verbosity, basic_test_cases, create_progress_callback,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration errors detected before any probe.
const EXIT_CONFIG_ERROR: u8 = 2;

/// Authentication method for ad-hoc probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Method {
    /// No authentication; send headers and cookies only
    #[default]
    None,
    /// Authorization header token
    Token,
    /// Username/password form login
    Login,
    /// Manual browser login (reported as unsupported)
    Interactive,
}

impl Method {
    /// Converts the CLI method to the library method.
    fn to_lib_method(self) -> LibAuthMethod {
        match self {
            Method::None => LibAuthMethod::None,
            Method::Token => LibAuthMethod::Token,
            Method::Login => LibAuthMethod::Login,
            Method::Interactive => LibAuthMethod::Interactive,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Coloured terminal output
    #[default]
    Text,
    /// Serialized results on stdout
    Json,
}

/// Authentication test harness.
///
/// Probes login, token, cookie and header authentication against a target
/// and checks each outcome against its expected result.
#[derive(Parser, Debug)]
#[command(name = "authprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show per-check verdicts and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show the pass/fail summary
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the authentication catalog against a target
    Suite(SuiteArgs),
    /// Run a single probe with caller-supplied credentials
    Probe(ProbeArgs),
    /// Login, access the protected endpoint, optionally idle, then log out
    Session(SessionArgs),
    /// List the catalog cases and their checks
    List(ListArgs),
}

/// Settings shared by every networked command.
#[derive(Args, Debug)]
pub struct HarnessArgs {
    /// Per-probe timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// YAML settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore HTTP_PROXY / HTTPS_PROXY from the environment
    #[arg(long)]
    pub no_system_proxy: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct SuiteArgs {
    /// Target base URL
    pub url: String,

    /// Number of probes allowed in flight
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Run only cases whose id or name contains this pattern
    #[arg(long)]
    pub filter: Option<String>,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Target URL
    pub url: String,

    /// Authentication method
    #[arg(long, value_enum, default_value_t = Method::None)]
    pub method: Method,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Authorization header value, sent verbatim
    #[arg(long)]
    pub token: Option<String>,

    /// Extra headers as a JSON object
    #[arg(long, value_name = "JSON")]
    pub headers: Option<String>,

    /// Cookies as a JSON object
    #[arg(long, value_name = "JSON")]
    pub cookies: Option<String>,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Target base URL
    pub url: String,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    /// Idle for this many seconds, then re-probe the protected endpoint
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        match cli.command {
            Commands::Suite(args) => run_suite(args, verbosity).await,
            Commands::Probe(args) => run_probe(args, verbosity).await,
            Commands::Session(args) => run_session(args, verbosity).await,
            Commands::List(args) => list_cases(&args, verbosity),
        }
    });

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if is_config_error(&e) {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("authprobe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn is_config_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<ConfigError>().is_some() || error.downcast_ref::<RunnerError>().is_some()
}

/// Builds settings from defaults, the optional file, the environment, then flags.
fn load_config(args: &HarnessArgs) -> Result<HarnessConfig> {
    let base = match &args.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    let mut config = base.with_env_overrides()?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.no_system_proxy {
        config.system_proxy = false;
    }
    config.validate()?;
    Ok(config)
}

/// Cancels the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Cancelling, waiting for results...".yellow());
            trigger.cancel();
        }
    });
    cancel
}

fn print_header(format: OutputFormat, verbosity: Verbosity) {
    if format == OutputFormat::Text && verbosity != Verbosity::Quiet {
        println!(
            "\n{} {}",
            "authprobe".bold(),
            format!("v{}", authprobe::VERSION).dimmed()
        );
        println!("{}", "━".repeat(40).dimmed());
    }
}

async fn run_suite(args: SuiteArgs, verbosity: Verbosity) -> Result<ExitCode> {
    let mut config = load_config(&args.harness)?;
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
        config.validate()?;
    }

    let format = args.harness.format;
    print_header(format, verbosity);

    let mut harness = AuthHarness::new(config)?;
    if let Some(filter) = &args.filter {
        harness = harness.with_filter(filter);
    }
    if format == OutputFormat::Text {
        harness = harness.on_progress(create_progress_callback(verbosity));
    }

    let cancel = cancel_on_ctrl_c();
    let suite = harness
        .execute_suite_with_cancel(&args.url, &cancel)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suite)?),
        OutputFormat::Text => {
            let reporter = TerminalReporter::with_verbosity(verbosity);
            if verbosity != Verbosity::Quiet {
                reporter.print_failures(&suite);
            }
            reporter.print_summary(&suite);
        }
    }

    Ok(if suite.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_probe(args: ProbeArgs, verbosity: Verbosity) -> Result<ExitCode> {
    let config = load_config(&args.harness)?;
    let format = args.harness.format;

    let credentials = Credentials {
        username: args.username,
        password: args.password,
        token: args.token,
        ..Credentials::default()
    }
    .with_headers_json(args.headers.as_deref().unwrap_or_default())?
    .with_cookies_json(args.cookies.as_deref().unwrap_or_default())?;
    let auth = AuthConfig::new(args.method.to_lib_method(), Some(credentials))?;

    print_header(format, verbosity);
    let harness = AuthHarness::new(config)?;
    let result = harness.probe(&args.url, &auth).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            TerminalReporter::with_verbosity(verbosity).print_probe(auth.method.as_str(), &result);
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_session(args: SessionArgs, verbosity: Verbosity) -> Result<ExitCode> {
    let config = load_config(&args.harness)?;
    let format = args.harness.format;
    let auth = AuthConfig::new(
        LibAuthMethod::Login,
        Some(Credentials::login(args.username, args.password)),
    )?;

    print_header(format, verbosity);
    let harness = AuthHarness::new(config)?;
    let cancel = cancel_on_ctrl_c();
    let report = harness
        .session(&args.url, &auth, args.wait.map(Duration::from_secs), &cancel)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => TerminalReporter::with_verbosity(verbosity).print_session(&report),
    }

    Ok(if report.login.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_cases(args: &ListArgs, verbosity: Verbosity) -> Result<ExitCode> {
    let cases = basic_test_cases();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cases)?),
        OutputFormat::Text => {
            print_header(args.format, verbosity);
            TerminalReporter::with_verbosity(verbosity).print_catalog(&cases);
            println!(
                "\n{}",
                format!(
                    "Total: {} case{}",
                    cases.len(),
                    if cases.len() == 1 { "" } else { "s" }
                )
                .dimmed()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
