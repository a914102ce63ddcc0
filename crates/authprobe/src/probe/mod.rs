//! HTTP probes, one per authentication strategy.
//!
//! A probe is a single HTTP exchange. It never fails: transport problems
//! (DNS, refused connections, timeouts) come back as a [`ProbeResult`] with
//! `status_code == 0`, and non-2xx responses come back with `success == false`
//! and an `HTTP {status}: {reason}` message.

mod executors;
pub mod session;

pub use executors::{BearerTokenProbe, CookieReplayProbe, CustomHeaderProbe, FormLoginProbe};

use crate::auth::{AuthConfig, AuthMethod, Credentials};
use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result};
use crate::extract::{extract_auth_tokens, normalize_headers, response_cookies};
use crate::models::{Cookies, ProbeResult};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, Response, Url};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Error message for a probe dropped by cancellation.
pub const PROBE_CANCELLED: &str = "Probe cancelled";

/// A strategy that turns credentials into one HTTP exchange.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Runs the probe against `target`.
    async fn execute(
        &self,
        client: &ProbeClient,
        target: &str,
        credentials: &Credentials,
    ) -> ProbeResult;
}

/// Picks the executor for a catalog case. Only `login` and `token` run
/// automatically; everything else is reported as unsupported.
pub fn catalog_executor(method: AuthMethod) -> Option<&'static dyn Executor> {
    match method {
        AuthMethod::Login => Some(&FormLoginProbe),
        AuthMethod::Token => Some(&BearerTokenProbe),
        AuthMethod::None | AuthMethod::Interactive => None,
    }
}

/// Picks the executor for a caller-supplied config.
///
/// `none` replays cookies when cookies are all that was supplied, otherwise
/// it sends the supplied headers (plus any cookies).
pub fn ad_hoc_executor(config: &AuthConfig) -> Option<&'static dyn Executor> {
    match config.method {
        AuthMethod::None => {
            let cookies_only = config
                .credentials
                .as_ref()
                .is_some_and(|creds| !creds.cookies.is_empty() && creds.headers.is_empty());
            if cookies_only {
                Some(&CookieReplayProbe)
            } else {
                Some(&CustomHeaderProbe)
            }
        }
        AuthMethod::Interactive => None,
        method => catalog_executor(method),
    }
}

/// Shared HTTP transport for probes.
///
/// Holds one cookie-less client. Probes that need a cookie jar get a fresh
/// client per exchange from [`ProbeClient::session`].
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: Client,
    config: HarnessConfig,
}

impl ProbeClient {
    /// Builds the transport. Fails on an invalid proxy URL or user agent.
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        let client = client_builder(config)?
            .build()
            .map_err(|err| ConfigError::InvalidSetting {
                setting: "http_client",
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Builds a client with its own empty cookie jar that records whether it
    /// followed a redirect.
    pub(crate) fn session(&self) -> std::result::Result<SessionClient, String> {
        let jar = Arc::new(Jar::default());
        let redirected = Arc::new(AtomicBool::new(false));
        let client = client_builder(&self.config)
            .map_err(|err| err.to_string())?
            .redirect(tracking_policy(
                self.config.max_redirects,
                Arc::clone(&redirected),
            ))
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|err| format!("Failed to build HTTP client: {err}"))?;

        Ok(SessionClient {
            client,
            jar,
            redirected,
        })
    }
}

/// A single-use client from [`ProbeClient::session`].
pub(crate) struct SessionClient {
    client: Client,
    jar: Arc<Jar>,
    redirected: Arc<AtomicBool>,
}

impl SessionClient {
    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    fn followed_redirect(&self) -> bool {
        self.redirected.load(Ordering::Acquire)
    }
}

/// `Policy::limited` that also flags every redirect it follows.
fn tracking_policy(max_redirects: usize, redirected: Arc<AtomicBool>) -> Policy {
    Policy::custom(move |attempt| {
        if max_redirects == 0 {
            attempt.stop()
        } else if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else {
            redirected.store(true, Ordering::Release);
            attempt.follow()
        }
    })
}

fn client_builder(config: &HarnessConfig) -> Result<ClientBuilder> {
    let redirect = if config.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(config.max_redirects)
    };

    let mut builder = Client::builder()
        .timeout(config.timeout())
        .redirect(redirect)
        .user_agent(config.user_agent.clone());

    if !config.system_proxy {
        builder = builder.no_proxy();
    }

    if let Some(proxy_url) = config.proxy_url.as_deref().filter(|url| !url.is_empty()) {
        let proxy = Proxy::all(proxy_url).map_err(|err| ConfigError::InvalidSetting {
            setting: "proxy_url",
            reason: err.to_string(),
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder)
}

/// Joins a base URL and a path without doubling the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Converts a header map into wire headers, later entries replacing earlier
/// ones case-insensitively.
pub(crate) fn build_headers(input: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|err| ConfigError::InvalidHeader {
                name: key.clone(),
                reason: err.to_string(),
            })?;
        let value = HeaderValue::from_str(value).map_err(|err| ConfigError::InvalidHeader {
            name: key.clone(),
            reason: err.to_string(),
        })?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Sends one request and normalizes the outcome.
pub(crate) async fn dispatch(request: RequestBuilder) -> ProbeResult {
    send(request, None).await
}

/// Like [`dispatch`], for a request built on `session`'s client.
///
/// `redirectUrl` is the final URL whenever a redirect was followed, even one
/// that lands back on the requested URL. Cookies held by the jar for the
/// final URL are folded into the result, since cookies set on intermediate
/// redirect responses only survive there.
pub(crate) async fn dispatch_session(
    request: RequestBuilder,
    session: &SessionClient,
) -> ProbeResult {
    send(request, Some(session)).await
}

async fn send(request: RequestBuilder, session: Option<&SessionClient>) -> ProbeResult {
    let (client, request) = request.build_split();
    let request = match request {
        Ok(request) => request,
        Err(err) => return ProbeResult::transport_failure(format!("Invalid request: {err}"), 0),
    };

    let requested_url = request.url().clone();
    debug!(method = %request.method(), url = %requested_url, "Dispatching probe");

    let start = Instant::now();
    let outcome = client.execute(request).await;
    let elapsed = elapsed_ms(start);

    match outcome {
        Ok(response) => {
            let mut result = from_response(&response, elapsed);
            if let Some(session) = session {
                if session.followed_redirect() {
                    result.redirect_url = Some(response.url().to_string());
                }
                for (name, value) in jar_cookies(&session.jar, response.url()) {
                    result.cookies.entry(name).or_insert(value);
                }
                result.auth_tokens = extract_auth_tokens(&result.headers, &result.cookies);
            }
            debug!(
                url = %requested_url,
                status = result.status_code,
                elapsed_ms = elapsed,
                redirected = result.redirect_url.is_some(),
                "Probe completed"
            );
            result
        }
        Err(err) => {
            let message = describe_transport_error(&err);
            warn!(url = %requested_url, error = %message, "Probe transport failure");
            ProbeResult::transport_failure(message, elapsed)
        }
    }
}

fn from_response(response: &Response, response_time_ms: u64) -> ProbeResult {
    let status = response.status();
    let headers = normalize_headers(response.headers());
    let cookies = response_cookies(&headers);
    let auth_tokens = extract_auth_tokens(&headers, &cookies);
    let success = status.is_success();

    let error_message = (!success).then(|| {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    });

    ProbeResult {
        success,
        status_code: status.as_u16(),
        response_time_ms,
        headers,
        cookies,
        redirect_url: None,
        error_message,
        auth_tokens,
    }
}

fn jar_cookies(jar: &Jar, url: &Url) -> Cookies {
    let Some(header) = jar.cookies(url) else {
        return Cookies::new();
    };
    let raw = String::from_utf8_lossy(header.as_bytes());

    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Request timed out: {err}")
    } else if err.is_connect() {
        format!("Connection failed: {err}")
    } else if err.is_redirect() {
        format!("Redirect failed: {err}")
    } else {
        format!("Request failed: {err}")
    }
}

/// Races a probe against `cancel`. A cancelled probe is dropped and reported
/// as a transport failure with [`PROBE_CANCELLED`].
pub async fn until_cancelled<F>(probe: F, cancel: &CancellationToken) -> ProbeResult
where
    F: Future<Output = ProbeResult>,
{
    let start = Instant::now();
    tokio::select! {
        result = probe => result,
        () = cancel.cancelled() => {
            debug!("Probe dropped by cancellation");
            ProbeResult::transport_failure(PROBE_CANCELLED, elapsed_ms(start))
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
