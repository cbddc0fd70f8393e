//! Locale resolution: cookie override, then `Accept-Language`, then default.

use crate::config::LocaleConfig;
use crate::i18n::accept_language::best_supported_locale_among;
use crate::i18n::{CookieJar, Locale};
use tracing::debug;

/// Resolve a request's locale.
///
/// Total: always returns a supported locale. The cookie named `cookie_name` wins
/// when its value (trimmed, lowercased) is exactly `en` or `zh`; otherwise the
/// best `Accept-Language` match is used; otherwise `default_locale`.
pub fn resolve(
    cookie_header: Option<&str>,
    accept_language_header: Option<&str>,
    cookie_name: &str,
    default_locale: Locale,
) -> Locale {
    let config = LocaleConfig {
        cookie_name: cookie_name.to_string(),
        default_locale,
        ..LocaleConfig::default()
    };
    LocaleResolver::new(&config).resolve(cookie_header, accept_language_header)
}

fn resolve_with(jar: &CookieJar, accept_language_header: Option<&str>, config: &LocaleConfig) -> Locale {
    if let Some(locale) = jar
        .get(&config.cookie_name)
        .and_then(|value| Locale::from_code(value).ok())
        .filter(|&locale| config.supports(locale))
    {
        debug!(%locale, source = "cookie", "Resolved locale");
        return locale;
    }

    if let Some(locale) = best_supported_locale_among(accept_language_header, &config.supported_locales) {
        debug!(%locale, source = "accept-language", "Resolved locale");
        return locale;
    }

    debug!(locale = %config.default_locale, source = "default", "Resolved locale");
    config.default_locale
}

/// Resolver bound to a process-wide [`LocaleConfig`].
#[derive(Debug, Clone, Copy)]
pub struct LocaleResolver<'a> {
    config: &'a LocaleConfig,
}

impl<'a> LocaleResolver<'a> {
    pub fn new(config: &'a LocaleConfig) -> Self {
        Self { config }
    }

    /// Resolve from raw header values.
    pub fn resolve(&self, cookie_header: Option<&str>, accept_language: Option<&str>) -> Locale {
        self.resolve_jar(&CookieJar::parse(cookie_header), accept_language)
    }

    /// Resolve from an already parsed cookie jar.
    pub fn resolve_jar(&self, jar: &CookieJar, accept_language: Option<&str>) -> Locale {
        resolve_with(jar, accept_language, self.config)
    }
}
