//! Live checks against a running docs deployment.
//!
//! The expected answer for every root request is computed with the same
//! [`decide`] used by the server adapters, so a deployment that drifts from the
//! shared negotiation rules fails the probe.

use std::str::FromStr;

use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LocaleConfig;
use crate::i18n::Locale;
use crate::redirect::{decide, RedirectRequest, Scheme};
use crate::retry::{with_retry, with_retry_if, RetryConfig};

/// Bodies shorter than this (in characters) count as an empty page.
pub const MIN_PAGE_BODY_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Invalid page check '{0}'")]
    InvalidPageCheck(String),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url}: expected status {expected}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: String,
        actual: StatusCode,
    },

    #[error("{url}: expected redirect to {expected}, got {actual:?}")]
    WrongLocation {
        url: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("{url}: expected Set-Cookie {expected:?}, got {actual:?}")]
    WrongCookie {
        url: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("{url}: missing text {needle:?}")]
    MissingText { url: String, needle: String },

    #[error("{url}: unexpected text {needle:?}")]
    ForbiddenText { url: String, needle: String },

    #[error("{url}: page body too short ({length} chars)")]
    EmptyPage { url: String, length: usize },
}

impl ProbeError {
    /// Whether the failure may clear up on its own (the server is not up yet).
    pub fn is_transient(&self) -> bool {
        matches!(self, ProbeError::Request { .. })
    }
}

/// A root request to send, described by the headers it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootScenario {
    pub name: String,
    pub cookie: Option<String>,
    pub accept_language: Option<String>,
    pub query: String,
}

impl RootScenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cookie: None,
            accept_language: None,
            query: String::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.cookie = Some(cookie.to_string());
        self
    }

    pub fn with_accept_language(mut self, accept_language: &str) -> Self {
        self.accept_language = Some(accept_language.to_string());
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }
}

/// Root scenarios covering each precedence step of locale resolution.
pub fn default_scenarios(config: &LocaleConfig) -> Vec<RootScenario> {
    vec![
        RootScenario::new("no preference").with_query("?utm_source=probe"),
        RootScenario::new("accept-language zh").with_accept_language("zh-CN,zh;q=0.9,en;q=0.8"),
        RootScenario::new("cookie overrides header")
            .with_cookie(&format!("{}=zh", config.cookie_name))
            .with_accept_language("en-US,en;q=0.9"),
        RootScenario::new("invalid cookie").with_cookie(&format!("{}=xx", config.cookie_name)),
    ]
}

/// A page that must load, with optional content assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCheck {
    pub path: String,
    pub must_contain: Vec<String>,
    pub must_not_contain: Vec<String>,
}

impl PageCheck {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            must_contain: Vec::new(),
            must_not_contain: Vec::new(),
        }
    }

    pub fn containing(mut self, needle: &str) -> Self {
        self.must_contain.push(needle.to_string());
        self
    }

    pub fn not_containing(mut self, needle: &str) -> Self {
        self.must_not_contain.push(needle.to_string());
        self
    }
}

/// Parses `PATH[,+TEXT][,!TEXT]...`, e.g. `/zh/tools/models/,+模型列表,!starlight-theme-select`.
/// `+` requires the text in the body, `!` forbids it.
impl FromStr for PageCheck {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let path = parts.next().unwrap_or_default().trim();
        if !path.starts_with('/') {
            return Err(ProbeError::InvalidPageCheck(s.to_string()));
        }

        parts.try_fold(PageCheck::new(path), |page, part| {
            match (part.strip_prefix('+'), part.strip_prefix('!')) {
                (Some(needle), _) if !needle.is_empty() => Ok(page.containing(needle)),
                (_, Some(needle)) if !needle.is_empty() => Ok(page.not_containing(needle)),
                _ => Err(ProbeError::InvalidPageCheck(s.to_string())),
            }
        })
    }
}

/// Pages the deployed site must serve, for every supported locale.
///
/// Locale roots must render the language picker and must not render a theme
/// switcher; the tool pages must ship their interactive form.
pub fn default_pages(config: &LocaleConfig) -> Vec<PageCheck> {
    config
        .supported_locales
        .iter()
        .flat_map(|&locale| locale_pages(locale))
        .collect()
}

fn locale_pages(locale: Locale) -> Vec<PageCheck> {
    let code = locale.code();
    let (tester_title, models_title) = match locale {
        Locale::En => ("API Tester", "Models"),
        Locale::Zh => ("在线 API 测试", "模型列表"),
    };

    vec![
        PageCheck::new(&format!("/{code}/"))
            .containing("starlight-lang-select")
            .not_containing("data-su8-theme-toggle")
            .not_containing("starlight-theme-select"),
        PageCheck::new(&format!("/{code}/tools/api-tester/"))
            .containing(tester_title)
            .containing("API Key")
            .containing("type=\"password\""),
        // The model loader button is untranslated on both sites
        PageCheck::new(&format!("/{code}/tools/models/"))
            .containing(models_title)
            .containing("加载模型")
            .containing("type=\"password\""),
        PageCheck::new(&format!("/{code}/codex/install/")),
    ]
}

/// Outcome of a full probe run.
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub passed: usize,
    pub failures: Vec<ProbeError>,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, what: &str, result: Result<(), ProbeError>) {
        match result {
            Ok(()) => {
                info!("✓ {}", what);
                self.passed += 1;
            }
            Err(e) => {
                warn!("✗ {}: {}", what, e);
                self.failures.push(e);
            }
        }
    }
}

pub struct Prober {
    client: Client,
    base_url: Url,
    locale: LocaleConfig,
    retry: RetryConfig,
}

impl Prober {
    /// Create a prober for `base_url`. Redirects are never followed.
    pub fn new(base_url: &str, locale: LocaleConfig) -> Result<Self, ProbeError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ProbeError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ProbeError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|source| ProbeError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            locale,
            retry: RetryConfig::page_fetch(),
        })
    }

    /// Override the retry policy used for individual checks.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path_and_query: &str) -> Result<Url, ProbeError> {
        self.base_url
            .join(path_and_query)
            .map_err(|_| ProbeError::InvalidBaseUrl(format!("{}{}", self.base_url, path_and_query)))
    }

    fn scheme(&self) -> Scheme {
        if self.base_url.scheme() == "https" {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// Poll `path` until it answers with a success status.
    pub async fn wait_until_ready(&self, path: &str, retry: &RetryConfig) -> Result<(), ProbeError> {
        let url = self.url(path)?;
        info!("Waiting up to {:?} for {}", retry.total_wait(), url);

        with_retry(retry, "wait_until_ready", || {
            let url = url.clone();
            async move {
                let response = self.get(&url, None, None).await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(ProbeError::UnexpectedStatus {
                        url: url.to_string(),
                        expected: "2xx".to_string(),
                        actual: response.status(),
                    })
                }
            }
        })
        .await
    }

    async fn get(
        &self,
        url: &Url,
        cookie: Option<&str>,
        accept_language: Option<&str>,
    ) -> Result<reqwest::Response, ProbeError> {
        let mut request = self.client.get(url.clone());
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        if let Some(accept_language) = accept_language {
            request = request.header(ACCEPT_LANGUAGE, accept_language);
        }

        request.send().await.map_err(|source| ProbeError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Check one root request against the shared redirect decision.
    pub async fn check_root(&self, scenario: &RootScenario) -> Result<(), ProbeError> {
        let expected = decide(
            &RedirectRequest {
                path: "/",
                query: &scenario.query,
                cookie_header: scenario.cookie.as_deref(),
                accept_language: scenario.accept_language.as_deref(),
                scheme: self.scheme(),
            },
            &self.locale,
        );
        let url = self.url(&format!("/{}", scenario.query))?;

        let response = with_retry_if(
            &self.retry,
            &scenario.name,
            || {
                self.get(
                    &url,
                    scenario.cookie.as_deref(),
                    scenario.accept_language.as_deref(),
                )
            },
            ProbeError::is_transient,
        )
        .await?;

        if response.status() != StatusCode::FOUND {
            return Err(ProbeError::UnexpectedStatus {
                url: url.to_string(),
                expected: StatusCode::FOUND.to_string(),
                actual: response.status(),
            });
        }

        let location = header_string(&response, LOCATION);
        // Absolute and relative Location values are both acceptable
        let resolved = location
            .as_deref()
            .and_then(|location| url.join(location).ok())
            .map(|target| match target.query() {
                Some(query) => format!("{}?{}", target.path(), query),
                None => target.path().to_string(),
            });
        if resolved.as_deref() != Some(expected.target_path.as_str()) {
            return Err(ProbeError::WrongLocation {
                url: url.to_string(),
                expected: expected.target_path,
                actual: location,
            });
        }

        let cookie = header_string(&response, SET_COOKIE);
        let expected_cookie = expected.set_cookie_header(&self.locale);
        if cookie != expected_cookie {
            return Err(ProbeError::WrongCookie {
                url: url.to_string(),
                expected: expected_cookie,
                actual: cookie,
            });
        }

        Ok(())
    }

    /// Check that a page loads and carries the expected markers.
    pub async fn check_page(&self, page: &PageCheck) -> Result<(), ProbeError> {
        let url = self.url(&page.path)?;

        let response = with_retry_if(
            &self.retry,
            &page.path,
            || self.get(&url, None, None),
            ProbeError::is_transient,
        )
        .await?;

        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                url: url.to_string(),
                expected: "2xx".to_string(),
                actual: response.status(),
            });
        }

        let body = response.text().await.map_err(|source| ProbeError::Request {
            url: url.to_string(),
            source,
        })?;

        let length = body.chars().count();
        if length < MIN_PAGE_BODY_LEN {
            return Err(ProbeError::EmptyPage {
                url: url.to_string(),
                length,
            });
        }

        if let Some(needle) = page.must_contain.iter().find(|n| !body.contains(n.as_str())) {
            return Err(ProbeError::MissingText {
                url: url.to_string(),
                needle: needle.clone(),
            });
        }
        if let Some(needle) = page.must_not_contain.iter().find(|n| body.contains(n.as_str())) {
            return Err(ProbeError::ForbiddenText {
                url: url.to_string(),
                needle: needle.clone(),
            });
        }

        Ok(())
    }

    /// Run every scenario and page check, collecting all failures.
    pub async fn run(&self, scenarios: &[RootScenario], pages: &[PageCheck]) -> ProbeReport {
        let mut report = ProbeReport::default();

        for scenario in scenarios {
            let result = self.check_root(scenario).await;
            report.record(&format!("root: {}", scenario.name), result);
        }
        for page in pages {
            let result = self.check_page(page).await;
            report.record(&format!("page: {}", page.path), result);
        }

        report
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
