use super::{Executor, ProbeClient, build_headers, dispatch, dispatch_session, endpoint};
use crate::auth::Credentials;
use crate::error::{ConfigError, Result};
use crate::extract::cookie_header;
use crate::models::ProbeResult;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE, HeaderMap, HeaderValue};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json";

/// POSTs `username`/`password` as a urlencoded form to `{target}/login`.
///
/// Each probe gets a fresh cookie jar, so cookies set by one case are never
/// replayed by the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormLoginProbe;

#[async_trait]
impl Executor for FormLoginProbe {
    fn name(&self) -> &'static str {
        "form-login"
    }

    async fn execute(
        &self,
        client: &ProbeClient,
        target: &str,
        credentials: &Credentials,
    ) -> ProbeResult {
        let session = match client.session() {
            Ok(session) => session,
            Err(message) => return ProbeResult::transport_failure(message, 0),
        };

        let form = [
            ("username", credentials.username.as_deref().unwrap_or_default()),
            ("password", credentials.password.as_deref().unwrap_or_default()),
        ];
        let request = session
            .http()
            .post(endpoint(target, "login"))
            .header(ACCEPT, ACCEPT_HTML)
            .form(&form);

        dispatch_session(request, &session).await
    }
}

/// GETs the target with `Authorization` set verbatim to the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenProbe;

#[async_trait]
impl Executor for BearerTokenProbe {
    fn name(&self) -> &'static str {
        "bearer-token"
    }

    async fn execute(
        &self,
        client: &ProbeClient,
        target: &str,
        credentials: &Credentials,
    ) -> ProbeResult {
        let token = credentials.token.as_deref().unwrap_or_default();
        let authorization = match HeaderValue::from_str(token) {
            Ok(value) => value,
            Err(err) => {
                return ProbeResult::transport_failure(
                    format!("Invalid Authorization header: {err}"),
                    0,
                );
            }
        };

        let request = client
            .http()
            .get(target)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, ACCEPT_JSON);

        dispatch(request).await
    }
}

/// GETs the target with the supplied cookies in a single `Cookie` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieReplayProbe;

#[async_trait]
impl Executor for CookieReplayProbe {
    fn name(&self) -> &'static str {
        "cookie-replay"
    }

    async fn execute(
        &self,
        client: &ProbeClient,
        target: &str,
        credentials: &Credentials,
    ) -> ProbeResult {
        let cookies = cookie_header(&credentials.cookies);
        let request = client
            .http()
            .get(target)
            .header(COOKIE, cookies)
            .header(ACCEPT, ACCEPT_HTML);

        dispatch(request).await
    }
}

/// GETs the target with caller headers over a default `Accept: application/json`.
///
/// Supplied cookies are sent as a `Cookie` header unless the caller set one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomHeaderProbe;

impl CustomHeaderProbe {
    fn header_map(credentials: &Credentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        if !credentials.cookies.is_empty() {
            let cookies = cookie_header(&credentials.cookies);
            let value =
                HeaderValue::from_str(&cookies).map_err(|err| ConfigError::InvalidHeader {
                    name: COOKIE.to_string(),
                    reason: err.to_string(),
                })?;
            headers.insert(COOKIE, value);
        }
        // Extending a HeaderMap replaces existing names, so caller entries win.
        headers.extend(build_headers(&credentials.headers)?);
        Ok(headers)
    }
}

#[async_trait]
impl Executor for CustomHeaderProbe {
    fn name(&self) -> &'static str {
        "custom-header"
    }

    async fn execute(
        &self,
        client: &ProbeClient,
        target: &str,
        credentials: &Credentials,
    ) -> ProbeResult {
        let headers = match Self::header_map(credentials) {
            Ok(headers) => headers,
            Err(err) => return ProbeResult::transport_failure(err.to_string(), 0),
        };

        let request = client.http().get(target).headers(headers);
        dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;

    fn offline_client() -> ProbeClient {
        ProbeClient::new(&HarnessConfig::default().with_system_proxy(false)).unwrap()
    }

    #[test]
    fn test_custom_header_defaults() {
        let headers = CustomHeaderProbe::header_map(&Credentials::default()).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_custom_header_caller_overrides_accept() {
        for name in ["Accept", "accept", "ACCEPT"] {
            let creds = Credentials::default().with_header(name, "text/plain");
            let headers = CustomHeaderProbe::header_map(&creds).unwrap();
            assert_eq!(headers.get_all(ACCEPT).iter().count(), 1, "{name}");
            assert_eq!(headers[ACCEPT], "text/plain", "{name}");
        }
    }

    #[test]
    fn test_custom_header_includes_cookies() {
        let creds = Credentials::default()
            .with_cookie("b", "2")
            .with_cookie("a", "1");
        let headers = CustomHeaderProbe::header_map(&creds).unwrap();
        assert_eq!(headers[COOKIE], "a=1; b=2");

        let creds = creds.with_header("Cookie", "override=1");
        let headers = CustomHeaderProbe::header_map(&creds).unwrap();
        assert_eq!(headers[COOKIE], "override=1");
    }

    #[tokio::test]
    async fn test_every_executor_reports_transport_failure() {
        let client = offline_client();
        let creds = Credentials::login("user", "pass")
            .with_token("Bearer abc")
            .with_cookie("sessionId", "xyz");
        let executors: [&dyn Executor; 4] = [
            &FormLoginProbe,
            &BearerTokenProbe,
            &CookieReplayProbe,
            &CustomHeaderProbe,
        ];

        for executor in executors {
            let result = executor.execute(&client, "http://127.0.0.1:1", &creds).await;
            assert!(!result.success, "{}", executor.name());
            assert_eq!(result.status_code, 0, "{}", executor.name());
            assert!(result.error_message.is_some(), "{}", executor.name());
            assert!(result.redirect_url.is_none(), "{}", executor.name());
        }
    }

    #[tokio::test]
    async fn test_bearer_rejects_unsendable_token_without_network() {
        let client = offline_client();
        let result = BearerTokenProbe
            .execute(&client, "http://127.0.0.1:1", &Credentials::token("a\nb"))
            .await;
        assert_eq!(result.status_code, 0);
        assert_eq!(result.response_time_ms, 0);
        assert!(
            result
                .error_message
                .unwrap()
                .starts_with("Invalid Authorization header")
        );
    }
}
