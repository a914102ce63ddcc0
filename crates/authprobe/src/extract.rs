//! Artifact extraction from raw responses.
//!
//! Pure functions: no I/O, never fail. Malformed input degrades to omitted
//! entries.

use crate::models::{AuthTokens, Cookies, Headers};

const BEARER_PREFIX: &str = "Bearer ";

/// Parses a `Set-Cookie` style string into a cookie map.
///
/// Definitions are separated by commas, each shaped `name=value; attr=...`.
/// Only the leading `name=value` pair of each definition is kept. Entries
/// without `=`, or with an empty name or value, are skipped.
///
/// ```
/// use authprobe::extract::extract_cookies;
///
/// let cookies = extract_cookies("sessionId=abc; Path=/; HttpOnly, theme=dark");
/// assert_eq!(cookies.get("sessionId").map(String::as_str), Some("abc"));
/// assert_eq!(cookies.len(), 2);
/// ```
pub fn extract_cookies(raw_set_cookie: &str) -> Cookies {
    let mut cookies = Cookies::new();

    for definition in raw_set_cookie.split(',') {
        let pair = definition.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        cookies.insert(name.to_string(), value.to_string());
    }

    cookies
}

/// Joins cookies into a `Cookie` request header value (`a=1; b=2`).
pub fn cookie_header(cookies: &Cookies) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Finds authentication artifacts in response headers and cookies.
///
/// * `authorization: Bearer <jwt>` yields `jwt_token`.
/// * A cookie whose name contains `session` (any case) yields `session_token`.
/// * Otherwise a cookie whose name contains `csrf` or `xsrf` yields `csrf_token`.
///
/// Returns `None` when nothing was found.
pub fn extract_auth_tokens(headers: &Headers, cookies: &Cookies) -> Option<AuthTokens> {
    let mut tokens = AuthTokens::default();

    if let Some(jwt) = headers
        .get("authorization")
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
    {
        tokens.jwt_token = Some(jwt.to_string());
    }

    for (name, value) in cookies {
        let lower = name.to_lowercase();
        if lower.contains("session") {
            tokens.session_token = Some(value.clone());
        } else if lower.contains("csrf") || lower.contains("xsrf") {
            tokens.csrf_token = Some(value.clone());
        }
    }

    if tokens.is_empty() { None } else { Some(tokens) }
}

/// Copies a reqwest header map into [`Headers`], joining repeated names.
pub fn normalize_headers(raw: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in raw {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers.append(name.as_str(), value);
    }
    headers
}

/// Extracts cookies from every `Set-Cookie` line of a normalized header set.
pub fn response_cookies(headers: &Headers) -> Cookies {
    headers
        .get("set-cookie")
        .map(extract_cookies)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

    #[test]
    fn test_extract_cookies_empty_input() {
        assert!(extract_cookies("").is_empty());
        assert!(extract_cookies("   ").is_empty());
    }

    #[test]
    fn test_extract_cookies_multiple_definitions() {
        let cookies = extract_cookies("a=1; Path=/, b=2; HttpOnly; Secure, c=3");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "2");
        assert_eq!(cookies["c"], "3");
    }

    #[test]
    fn test_extract_cookies_skips_malformed_entries() {
        let cookies = extract_cookies("novalue, =orphan, empty=, good=yes");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["good"], "yes");
    }

    #[test]
    fn test_extract_cookies_survives_expires_commas() {
        let cookies =
            extract_cookies("id=42; Expires=Wed, 21 Oct 2015 07:28:00 GMT, lang=en; Path=/");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["id"], "42");
        assert_eq!(cookies["lang"], "en");
    }

    #[test]
    fn test_extract_cookies_keeps_padding_in_value() {
        let cookies = extract_cookies("token=YWJj==; Path=/");
        assert_eq!(cookies["token"], "YWJj==");
    }

    #[test]
    fn test_extract_cookies_rejoin_is_stable() {
        let inputs = [
            "a=1; Path=/, b=2",
            "session=xyz; HttpOnly, broken, csrf=tok==",
            " spaced = value ; Secure",
            "",
        ];
        for input in inputs {
            let first = extract_cookies(input);
            let rejoined = first
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            assert_eq!(extract_cookies(&rejoined), first, "input: {input:?}");
        }
    }

    #[test]
    fn test_cookie_header_joins_in_map_order() {
        let mut cookies = Cookies::new();
        cookies.insert("b".to_string(), "2".to_string());
        cookies.insert("a".to_string(), "1".to_string());
        assert_eq!(cookie_header(&cookies), "a=1; b=2");
        assert_eq!(cookie_header(&Cookies::new()), "");
    }

    #[test]
    fn test_tokens_from_bearer_header() {
        let headers: Headers = [("authorization", "Bearer abc123")].into_iter().collect();
        let tokens = extract_auth_tokens(&headers, &Cookies::new()).unwrap();
        assert_eq!(tokens.jwt_token.as_deref(), Some("abc123"));
        assert!(tokens.session_token.is_none());
        assert!(tokens.csrf_token.is_none());
    }

    #[test]
    fn test_tokens_from_session_cookie() {
        let cookies: Cookies = [("sessionId".to_string(), "xyz".to_string())].into();
        let tokens = extract_auth_tokens(&Headers::new(), &cookies).unwrap();
        assert_eq!(
            tokens,
            AuthTokens {
                session_token: Some("xyz".to_string()),
                ..AuthTokens::default()
            }
        );
    }

    #[test]
    fn test_tokens_absent_when_nothing_found() {
        assert!(extract_auth_tokens(&Headers::new(), &Cookies::new()).is_none());

        let headers: Headers = [("authorization", "Basic dXNlcjpwYXNz")].into_iter().collect();
        let cookies: Cookies = [("theme".to_string(), "dark".to_string())].into();
        assert!(extract_auth_tokens(&headers, &cookies).is_none());
    }

    #[test]
    fn test_tokens_csrf_and_xsrf_case_insensitive() {
        let cookies: Cookies = [("XSRF-TOKEN".to_string(), "t1".to_string())].into();
        let tokens = extract_auth_tokens(&Headers::new(), &cookies).unwrap();
        assert_eq!(tokens.csrf_token.as_deref(), Some("t1"));

        let cookies: Cookies = [("Csrf_Guard".to_string(), "t2".to_string())].into();
        let tokens = extract_auth_tokens(&Headers::new(), &cookies).unwrap();
        assert_eq!(tokens.csrf_token.as_deref(), Some("t2"));
    }

    #[test]
    fn test_tokens_empty_bearer_is_present_but_empty() {
        let headers: Headers = [("Authorization", "Bearer ")].into_iter().collect();
        let tokens = extract_auth_tokens(&headers, &Cookies::new()).unwrap();
        assert_eq!(tokens.jwt_token.as_deref(), Some(""));
    }

    #[test]
    fn test_normalize_headers_joins_set_cookie_lines() {
        let mut raw = HeaderMap::new();
        raw.append(SET_COOKIE, HeaderValue::from_static("session_id=s1; HttpOnly"));
        raw.append(SET_COOKIE, HeaderValue::from_static("csrftoken=c1; Path=/"));
        raw.insert("WWW-Authenticate", HeaderValue::from_static("Bearer"));

        let headers = normalize_headers(&raw);
        assert_eq!(
            headers.get("set-cookie"),
            Some("session_id=s1; HttpOnly, csrftoken=c1; Path=/")
        );
        assert_eq!(headers.get("www-authenticate"), Some("Bearer"));

        let cookies = response_cookies(&headers);
        assert_eq!(cookies["session_id"], "s1");
        assert_eq!(cookies["csrftoken"], "c1");
    }
}
