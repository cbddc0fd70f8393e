//! Locale type: the closed set of languages the docs site is published in.
//!
//! Every value downstream of the resolver is a `Locale`, so an unvalidated
//! language code can never reach a redirect target or a cookie.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a code does not name a supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported locale code: '{0}'")]
pub struct UnsupportedLocale(pub String);

/// A supported site locale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Simplified Chinese
    Zh,
}

impl Locale {
    /// All supported locales, in site order.
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    /// Parse a locale code.
    ///
    /// The input is trimmed and lowercased, then must equal `"en"` or `"zh"`
    /// exactly. Region-qualified tags such as `"zh-CN"` are rejected here;
    /// prefix matching only happens during `Accept-Language` negotiation.
    ///
    /// # Example
    /// ```ignore
    /// let zh = Locale::from_code(" ZH ")?;
    /// ```
    pub fn from_code(code: &str) -> Result<Locale, UnsupportedLocale> {
        match code.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "zh" => Ok(Locale::Zh),
            _ => Err(UnsupportedLocale(code.to_string())),
        }
    }

    /// The URL path segment and cookie value for this locale (e.g. "en", "zh").
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// English name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Zh => "Chinese",
        }
    }

    /// Name shown in the site's language picker.
    pub fn native_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Zh => "中文",
        }
    }

    /// Value used for the HTML `lang` attribute of pages in this locale.
    pub fn html_lang(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh-CN",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_code(s)
    }
}
