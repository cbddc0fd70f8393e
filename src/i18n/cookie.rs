//! `Cookie` request header parsing.

use std::collections::HashMap;

/// Cookies presented by a single request, keyed by name.
///
/// Values are kept exactly as sent (trimmed, not percent-decoded). When a name
/// appears more than once, the later occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// Parse a raw `Cookie` header.
    ///
    /// Never fails: an absent or empty header gives an empty jar, and fragments
    /// without `=` or with an empty name are skipped. Only the first `=` of a
    /// fragment separates name from value, so base64 values survive intact.
    pub fn parse(header: Option<&str>) -> Self {
        let mut cookies = HashMap::new();

        let Some(header) = header else {
            return Self { cookies };
        };

        for fragment in header.split(';') {
            let Some((name, value)) = fragment.split_once('=') else {
                continue;
            };

            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            cookies.insert(name.to_string(), value.trim().to_string());
        }

        Self { cookies }
    }

    /// Raw value of the named cookie.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Whether the request carried a cookie with this name, whatever its value.
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
