//! Root redirect decision and its HTTP materialization.
//!
//! A request for exactly `/` is sent to `/{locale}/` (query preserved) with a
//! `302`, and the locale cookie is written when the request did not carry one.
//! Every other path passes through untouched. Both host adapters go through
//! [`decide`] and [`redirect_response`]; neither negotiates on its own.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{info, warn};

use crate::config::LocaleConfig;
use crate::i18n::{CookieJar, Locale, LocaleResolver};

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Request scheme, as far as the locale cookie's `Secure` flag is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Scheme of an inbound request.
    ///
    /// Uses the URI's scheme when the request target is absolute, then the first
    /// `X-Forwarded-Proto` value, and falls back to plain HTTP.
    pub fn detect(uri: &Uri, headers: &HeaderMap) -> Scheme {
        if let Some(scheme) = uri.scheme_str() {
            return Scheme::from_name(scheme);
        }

        headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(Scheme::from_name)
            .unwrap_or(Scheme::Http)
    }

    fn from_name(name: &str) -> Scheme {
        if name.trim().eq_ignore_ascii_case("https") {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }
}

/// The parts of a request the redirect decision reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectRequest<'a> {
    pub path: &'a str,
    /// Search string including its leading `?`, or empty.
    pub query: &'a str,
    pub cookie_header: Option<&'a str>,
    pub accept_language: Option<&'a str>,
    pub scheme: Scheme,
}

impl<'a> RedirectRequest<'a> {
    /// Borrow the relevant parts of an HTTP request.
    ///
    /// Header values that are not visible ASCII are treated as absent. A bare
    /// trailing `?` counts as no query.
    pub fn from_http(uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        let query = uri
            .path_and_query()
            .and_then(|pq| pq.as_str().find('?').map(|idx| &pq.as_str()[idx..]))
            .filter(|search| *search != "?")
            .unwrap_or_default();

        Self {
            path: uri.path(),
            query,
            cookie_header: header_str(headers, header::COOKIE),
            accept_language: header_str(headers, header::ACCEPT_LANGUAGE),
            scheme: Scheme::detect(uri, headers),
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Outcome of [`decide`] for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    pub should_redirect: bool,
    /// `/{locale}/{query}`; empty when not redirecting.
    pub target_path: String,
    pub locale: Locale,
    /// Whether a `Set-Cookie` must accompany the redirect.
    pub set_cookie: bool,
    /// Whether the cookie gets the `Secure` attribute.
    pub secure: bool,
}

impl RedirectDecision {
    fn pass_through(config: &LocaleConfig) -> Self {
        Self {
            should_redirect: false,
            target_path: String::new(),
            locale: config.default_locale,
            set_cookie: false,
            secure: false,
        }
    }

    /// The `Set-Cookie` value to send, if any.
    pub fn set_cookie_header(&self, config: &LocaleConfig) -> Option<String> {
        (self.should_redirect && self.set_cookie)
            .then(|| locale_cookie(self.locale, self.secure, config))
    }
}

/// Render the locale cookie, e.g.
/// `su8_locale=zh; Max-Age=31536000; Path=/; SameSite=Lax; Secure`.
pub fn locale_cookie(locale: Locale, secure: bool, config: &LocaleConfig) -> String {
    let mut parts = vec![
        format!(
            "{}={}",
            config.cookie_name,
            utf8_percent_encode(locale.code(), COMPONENT)
        ),
        format!("Max-Age={}", config.cookie_max_age),
        format!("Path={}", config.cookie_path),
        format!("SameSite={}", config.cookie_same_site.as_str()),
    ];
    if secure {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

/// Decide whether `request` is redirected to a locale root.
///
/// Only a path of exactly `/` triggers. The cookie is written only when no cookie
/// with the configured name was sent, even if the sent value was not a valid
/// locale.
pub fn decide(request: &RedirectRequest<'_>, config: &LocaleConfig) -> RedirectDecision {
    if request.path != "/" {
        return RedirectDecision::pass_through(config);
    }

    let jar = CookieJar::parse(request.cookie_header);
    let locale = LocaleResolver::new(config).resolve_jar(&jar, request.accept_language);
    let has_cookie = jar.contains(&config.cookie_name);

    let decision = RedirectDecision {
        should_redirect: true,
        target_path: format!("/{}/{}", locale.code(), request.query),
        locale,
        set_cookie: !has_cookie,
        secure: request.scheme == Scheme::Https,
    };

    info!(
        %locale,
        location = %decision.target_path,
        set_cookie = decision.set_cookie,
        "Redirecting root request"
    );

    decision
}

/// Build the `302` response for a redirecting decision.
///
/// The header map is completed before the response exists, so hosts whose
/// responses have immutable headers are never asked to mutate one.
pub fn redirect_response(decision: &RedirectDecision, config: &LocaleConfig) -> Response {
    let mut headers = HeaderMap::new();

    let location = HeaderValue::from_str(&decision.target_path).unwrap_or_else(|e| {
        warn!(
            location = %decision.target_path,
            "Redirect target is not a valid header value ({}), dropping query",
            e
        );
        HeaderValue::from_static(match decision.locale {
            Locale::En => "/en/",
            Locale::Zh => "/zh/",
        })
    });
    headers.insert(header::LOCATION, location);

    if let Some(cookie) = decision.set_cookie_header(config) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Locale cookie is not a valid header value: {}", e),
        }
    }

    (StatusCode::FOUND, headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;

    fn root(cookie: Option<&'static str>, accept: Option<&'static str>) -> RedirectRequest<'static> {
        RedirectRequest {
            path: "/",
            query: "",
            cookie_header: cookie,
            accept_language: accept,
            scheme: Scheme::Http,
        }
    }

    fn uri(s: &str) -> Uri {
        s.parse().expect("valid uri")
    }

    // ==================== Trigger Tests ====================

    #[test]
    fn test_root_redirects_to_default() {
        let decision = decide(&root(None, None), &LocaleConfig::default());
        assert!(decision.should_redirect);
        assert_eq!(decision.target_path, "/en/");
        assert_eq!(decision.locale, Locale::En);
        assert!(decision.set_cookie);
    }

    #[test]
    fn test_non_root_passes_through() {
        let config = LocaleConfig::default();
        for path in ["/en/docs/", "/zh/", "/index.html", "//", ""] {
            let request = RedirectRequest {
                path,
                ..root(None, Some("zh"))
            };
            assert!(!decide(&request, &config).should_redirect, "path {path:?}");
        }
    }

    #[test]
    fn test_query_preserved_verbatim() {
        let request = RedirectRequest {
            query: "?utm_source=x&b=%20",
            ..root(None, Some("en"))
        };
        let decision = decide(&request, &LocaleConfig::default());
        assert_eq!(decision.target_path, "/en/?utm_source=x&b=%20");
    }

    #[test]
    fn test_header_locale_used() {
        let decision = decide(&root(None, Some("zh-CN,zh;q=0.9")), &LocaleConfig::default());
        assert_eq!(decision.target_path, "/zh/");
    }

    // ==================== Cookie Policy Tests ====================

    #[test]
    fn test_existing_cookie_suppresses_set_cookie() {
        let decision = decide(&root(Some("su8_locale=zh"), None), &LocaleConfig::default());
        assert_eq!(decision.locale, Locale::Zh);
        assert!(!decision.set_cookie);
    }

    #[test]
    fn test_invalid_cookie_still_suppresses_set_cookie() {
        let config = LocaleConfig::default();
        let decision = decide(&root(Some("su8_locale=klingon"), Some("zh")), &config);
        assert_eq!(decision.locale, Locale::Zh);
        assert!(!decision.set_cookie);
        assert_eq!(decision.set_cookie_header(&config), None);
    }

    #[test]
    fn test_empty_cookie_value_suppresses_set_cookie() {
        let decision = decide(&root(Some("su8_locale="), None), &LocaleConfig::default());
        assert!(!decision.set_cookie);
    }

    #[test]
    fn test_unrelated_cookie_does_not_suppress() {
        let decision = decide(&root(Some("theme=dark"), None), &LocaleConfig::default());
        assert!(decision.set_cookie);
    }

    #[test]
    fn test_pass_through_never_sets_cookie() {
        let config = LocaleConfig::default();
        let request = RedirectRequest {
            path: "/en/",
            ..root(None, None)
        };
        assert_eq!(decide(&request, &config).set_cookie_header(&config), None);
    }

    // ==================== Cookie Rendering Tests ====================

    #[test]
    fn test_locale_cookie_http() {
        let cookie = locale_cookie(Locale::Zh, false, &LocaleConfig::default());
        assert_eq!(cookie, "su8_locale=zh; Max-Age=31536000; Path=/; SameSite=Lax");
    }

    #[test]
    fn test_locale_cookie_https_is_secure() {
        let cookie = locale_cookie(Locale::En, true, &LocaleConfig::default());
        assert_eq!(cookie, "su8_locale=en; Max-Age=31536000; Path=/; SameSite=Lax; Secure");
    }

    #[test]
    fn test_locale_cookie_uses_config() {
        let config = LocaleConfig {
            cookie_name: "docs_lang".to_string(),
            cookie_max_age: 60,
            cookie_same_site: SameSite::Strict,
            ..LocaleConfig::default()
        };
        let cookie = locale_cookie(Locale::En, false, &config);
        assert_eq!(cookie, "docs_lang=en; Max-Age=60; Path=/; SameSite=Strict");
    }

    #[test]
    fn test_secure_follows_scheme() {
        let config = LocaleConfig::default();
        let request = RedirectRequest {
            scheme: Scheme::Https,
            ..root(None, None)
        };
        let decision = decide(&request, &config);
        assert!(decision.secure);
        assert!(decision.set_cookie_header(&config).unwrap().ends_with("; Secure"));
    }

    // ==================== Response Tests ====================

    #[test]
    fn test_redirect_response_with_cookie() {
        let config = LocaleConfig::default();
        let decision = decide(&root(None, Some("zh")), &config);
        let response = redirect_response(&decision, &config);

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/zh/");
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "su8_locale=zh; Max-Age=31536000; Path=/; SameSite=Lax"
        );
    }

    #[test]
    fn test_redirect_response_without_cookie() {
        let config = LocaleConfig::default();
        let decision = decide(&root(Some("su8_locale=en"), None), &config);
        let response = redirect_response(&decision, &config);

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/en/");
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_invalid_target_falls_back_to_locale_root() {
        let config = LocaleConfig::default();
        let decision = RedirectDecision {
            should_redirect: true,
            target_path: "/zh/?bad\nvalue".to_string(),
            locale: Locale::Zh,
            set_cookie: false,
            secure: false,
        };
        let response = redirect_response(&decision, &config);
        assert_eq!(response.headers()[header::LOCATION], "/zh/");
    }

    // ==================== Request Extraction Tests ====================

    #[test]
    fn test_from_http_extracts_parts() {
        let uri = uri("/?utm_source=x");
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("su8_locale=zh"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let request = RedirectRequest::from_http(&uri, &headers);
        assert_eq!(request.path, "/");
        assert_eq!(request.query, "?utm_source=x");
        assert_eq!(request.cookie_header, Some("su8_locale=zh"));
        assert_eq!(request.accept_language, Some("en"));
        assert_eq!(request.scheme, Scheme::Http);
    }

    #[test]
    fn test_from_http_bare_question_mark() {
        let uri = uri("/?");
        let headers = HeaderMap::new();
        let request = RedirectRequest::from_http(&uri, &headers);
        assert_eq!(request.query, "");
    }

    #[test]
    fn test_from_http_non_ascii_header_is_absent() {
        let uri = uri("/");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_bytes(b"zh\xff").expect("opaque bytes allowed"),
        );
        let request = RedirectRequest::from_http(&uri, &headers);
        assert_eq!(request.accept_language, None);
    }

    #[test]
    fn test_scheme_detection() {
        let empty = HeaderMap::new();
        assert_eq!(Scheme::detect(&uri("https://docs.example.com/"), &empty), Scheme::Https);
        assert_eq!(Scheme::detect(&uri("http://docs.example.com/"), &empty), Scheme::Http);
        assert_eq!(Scheme::detect(&uri("/"), &empty), Scheme::Http);

        let mut forwarded = HeaderMap::new();
        forwarded.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS, http"));
        assert_eq!(Scheme::detect(&uri("/"), &forwarded), Scheme::Https);
    }
}
