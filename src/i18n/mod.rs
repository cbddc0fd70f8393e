//! Locale negotiation for the docs site.
//!
//! Everything here is pure and request-scoped: parse the request's `Cookie` and
//! `Accept-Language` headers, then pick one supported locale.
//!
//! # Architecture
//!
//! - `language`: The closed `Locale` enum (`en`, `zh`)
//! - `cookie`: `Cookie` header parsing into a `CookieJar`
//! - `accept_language`: Weighted `Accept-Language` parsing and matching
//! - `resolver`: Cookie → header → default precedence chain
//!
//! # Example
//!
//! ```rust,ignore
//! use docs_locale_gate::i18n::{resolve, Locale};
//!
//! let locale = resolve(Some("su8_locale=zh"), Some("en-US"), "su8_locale", Locale::En);
//! assert_eq!(locale, Locale::Zh);
//! ```

mod accept_language;
mod cookie;
mod language;
mod resolver;

pub use accept_language::{
    best_supported_locale, best_supported_locale_among, parse_accept_language, LanguageRange,
};
pub use cookie::CookieJar;
pub use language::{Locale, UnsupportedLocale};
pub use resolver::{resolve, LocaleResolver};
