//! `Accept-Language` negotiation against the site's two locales.
//!
//! This is deliberately not a general RFC 4647 matcher: ranges are matched by
//! prefix against the two supported base languages (`en*`, `zh*`) only, and the
//! `*` wildcard never counts as a concrete match.

use crate::i18n::Locale;
use std::cmp::Ordering;

/// One weighted entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    /// Lowercased language tag as sent (e.g. "zh-cn", "*").
    pub tag: String,
    /// Quality weight in `[0, 1]`.
    pub quality: f64,
    /// 0-based index of the item in the comma-separated header.
    pub position: usize,
}

impl LanguageRange {
    /// Locale this range selects, if any.
    fn locale(&self) -> Option<Locale> {
        if self.tag == "*" {
            None
        } else if self.tag.starts_with("zh") {
            Some(Locale::Zh)
        } else if self.tag.starts_with("en") {
            Some(Locale::En)
        } else {
            None
        }
    }
}

/// Parse an `Accept-Language` header into ranges ordered by preference.
///
/// Ordering is quality descending, then header position ascending, so of two
/// equally weighted ranges the one listed first wins. Items with an empty tag are
/// dropped; an unparsable or out-of-range `q` keeps the default weight of 1.0.
pub fn parse_accept_language(header: Option<&str>) -> Vec<LanguageRange> {
    let raw = header.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut ranges: Vec<LanguageRange> = raw
        .split(',')
        .enumerate()
        .filter_map(|(position, item)| {
            let mut segments = item.split(';');
            let tag = segments.next()?.trim().to_lowercase();
            if tag.is_empty() {
                return None;
            }

            let quality = segments
                .map(|segment| segment.trim().to_lowercase())
                .find(|segment| segment.starts_with("q="))
                .and_then(|segment| parse_leading_float(&segment[2..]))
                .filter(|q| (0.0..=1.0).contains(q))
                .unwrap_or(1.0);

            Some(LanguageRange {
                tag,
                quality,
                position,
            })
        })
        .collect();

    ranges.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });

    ranges
}

/// Parse the longest numeric prefix of `input`, ignoring trailing garbage.
///
/// `"0.8"` and `"0.8x"` both give 0.8; input with no leading number gives
/// `None`.
fn parse_leading_float(input: &str) -> Option<f64> {
    let input = input.trim_start();
    let bytes = input.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    input[..end].parse().ok()
}

/// Best supported locale named by an `Accept-Language` header.
///
/// Returns `None` for an empty header or when no range matches `en*` or `zh*`.
pub fn best_supported_locale(header: Option<&str>) -> Option<Locale> {
    best_supported_locale_among(header, &Locale::ALL)
}

/// Like [`best_supported_locale`], but a range only matches when its locale is
/// in `supported`.
pub fn best_supported_locale_among(header: Option<&str>, supported: &[Locale]) -> Option<Locale> {
    parse_accept_language(header)
        .iter()
        .filter_map(LanguageRange::locale)
        .find(|locale| supported.contains(locale))
}
