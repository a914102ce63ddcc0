//! Follow-up probes that reuse the artifacts of an earlier login.
//!
//! These cover what happens after authentication: reaching a protected
//! resource, surviving (or not) an idle period, and logging out.

use super::{
    CustomHeaderProbe, Executor, FormLoginProbe, ProbeClient, dispatch_session, endpoint,
    until_cancelled,
};
use crate::auth::Credentials;
use crate::extract::cookie_header;
use crate::models::ProbeResult;
use reqwest::header::{ACCEPT, COOKIE};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default idle period before re-probing the protected endpoint.
pub const DEFAULT_SESSION_WAIT: Duration = Duration::from_secs(30);

const PROTECTED_PATH: &str = "api/protected";
const LOGOUT_PATH: &str = "logout";

/// GETs `{base}/api/protected` carrying whatever the prior probe obtained.
///
/// Sends `Authorization: Bearer <jwt>` and `X-CSRF-Token` when those tokens
/// were extracted, plus the prior cookies as a `Cookie` header.
pub async fn protected_endpoint(
    client: &ProbeClient,
    base: &str,
    prior: &ProbeResult,
) -> ProbeResult {
    CustomHeaderProbe
        .execute(client, &endpoint(base, PROTECTED_PATH), &carried_credentials(prior))
        .await
}

/// POSTs `{base}/logout` with the prior cookies, capturing any redirect.
pub async fn logout(client: &ProbeClient, base: &str, prior: &ProbeResult) -> ProbeResult {
    let session = match client.session() {
        Ok(session) => session,
        Err(message) => return ProbeResult::transport_failure(message, 0),
    };
    let request = session
        .http()
        .post(endpoint(base, LOGOUT_PATH))
        .header(COOKIE, cookie_header(&prior.cookies))
        .header(ACCEPT, "text/html,application/xhtml+xml");

    dispatch_session(request, &session).await
}

/// Waits `wait`, then re-probes the protected endpoint.
///
/// Cancelling during the wait returns a cancelled result without touching
/// the network.
pub async fn session_timeout(
    client: &ProbeClient,
    base: &str,
    prior: &ProbeResult,
    wait: Duration,
    cancel: &CancellationToken,
) -> ProbeResult {
    info!(wait_secs = wait.as_secs(), "Waiting before re-probing protected endpoint");
    until_cancelled(
        async {
            tokio::time::sleep(wait).await;
            protected_endpoint(client, base, prior).await
        },
        cancel,
    )
    .await
}

fn carried_credentials(prior: &ProbeResult) -> Credentials {
    let mut credentials = Credentials {
        cookies: prior.cookies.clone(),
        ..Credentials::default()
    };

    if let Some(tokens) = &prior.auth_tokens {
        if let Some(jwt) = tokens.jwt_token.as_deref().filter(|jwt| !jwt.is_empty()) {
            credentials = credentials.with_header("Authorization", format!("Bearer {jwt}"));
        }
        if let Some(csrf) = tokens.csrf_token.as_deref().filter(|csrf| !csrf.is_empty()) {
            credentials = credentials.with_header("X-CSRF-Token", csrf);
        }
    }

    credentials
}

/// Results of a full login, access, idle, logout sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub login: ProbeResult,
    pub protected: ProbeResult,
    /// Present only when an idle period was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_timeout: Option<ProbeResult>,
    pub logout: ProbeResult,
}

impl SessionReport {
    /// Steps in execution order, labelled.
    pub fn steps(&self) -> Vec<(&'static str, &ProbeResult)> {
        let mut steps = vec![("login", &self.login), ("protected", &self.protected)];
        if let Some(after_timeout) = &self.after_timeout {
            steps.push(("after-timeout", after_timeout));
        }
        steps.push(("logout", &self.logout));
        steps
    }
}

/// Runs form-login, then the follow-up probes using its artifacts.
pub async fn run_session(
    client: &ProbeClient,
    base: &str,
    credentials: &Credentials,
    wait: Option<Duration>,
    cancel: &CancellationToken,
) -> SessionReport {
    let login = until_cancelled(FormLoginProbe.execute(client, base, credentials), cancel).await;
    let protected = until_cancelled(protected_endpoint(client, base, &login), cancel).await;
    let after_timeout = match wait {
        Some(wait) => Some(session_timeout(client, base, &login, wait, cancel).await),
        None => None,
    };
    let logout = until_cancelled(logout(client, base, &login), cancel).await;

    SessionReport {
        login,
        protected,
        after_timeout,
        logout,
    }
}
