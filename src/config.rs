use anyhow::{bail, Context, Result};

use crate::i18n::Locale;

/// Name of the cookie that remembers a visitor's locale.
pub const DEFAULT_COOKIE_NAME: &str = "su8_locale";

/// One year, in seconds.
pub const DEFAULT_COOKIE_MAX_AGE: u64 = 31_536_000;

/// `SameSite` attribute of the locale cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Locale negotiation settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    // Negotiation
    pub supported_locales: Vec<Locale>,
    pub default_locale: Locale,

    // Cookie
    pub cookie_name: String,
    pub cookie_max_age: u64,
    pub cookie_path: String,
    pub cookie_same_site: SameSite,
}

impl LocaleConfig {
    /// Whether `locale` may be negotiated.
    pub fn supports(&self, locale: Locale) -> bool {
        self.supported_locales.contains(&locale)
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_locale = match std::env::var("DEFAULT_LOCALE") {
            Ok(code) => Locale::from_code(&code).context("DEFAULT_LOCALE is invalid")?,
            Err(_) => defaults.default_locale,
        };

        let supported_locales = match std::env::var("SUPPORTED_LOCALES") {
            Ok(list) => parse_locale_list(&list).context("SUPPORTED_LOCALES is invalid")?,
            Err(_) => defaults.supported_locales,
        };

        if !supported_locales.contains(&default_locale) {
            bail!(
                "DEFAULT_LOCALE '{}' is not in SUPPORTED_LOCALES",
                default_locale
            );
        }

        let cookie_name = std::env::var("LOCALE_COOKIE_NAME")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or(defaults.cookie_name);

        Ok(Self {
            supported_locales,
            default_locale,
            cookie_name,
            cookie_max_age: std::env::var("LOCALE_COOKIE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cookie_max_age),
            cookie_path: defaults.cookie_path,
            cookie_same_site: defaults.cookie_same_site,
        })
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            supported_locales: Locale::ALL.to_vec(),
            default_locale: Locale::En,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            cookie_path: "/".to_string(),
            cookie_same_site: SameSite::Lax,
        }
    }
}

/// Parse a comma-separated list of locale codes, dropping duplicates.
fn parse_locale_list(list: &str) -> Result<Vec<Locale>> {
    let mut locales = Vec::new();
    for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let locale = Locale::from_code(code)?;
        if !locales.contains(&locale) {
            locales.push(locale);
        }
    }

    if locales.is_empty() {
        bail!("no locales listed");
    }
    Ok(locales)
}

#[derive(Debug, Clone)]
pub struct Config {
    // Locale negotiation
    pub locale: LocaleConfig,

    // Dev server
    pub host: String,
    pub port: u16,
    pub docs_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            locale: LocaleConfig::from_env()?,

            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4321),
            // Build output of the static site generator
            docs_dir: std::env::var("DOCS_DIR").unwrap_or_else(|_| "dist".to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
