//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;
use std::fmt::Write;

/// Parse a CMS publication timestamp
///
/// Accepts RFC 3339 as well as the `+0000` offsets Prismic emits.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Map a language tag (`pt-BR`, `en`, `fr_FR`) to a chrono locale
pub fn locale_for(language: &str) -> Option<Locale> {
    let tag = language.trim().replace('-', "_").to_ascii_lowercase();
    let locale = match tag.as_str() {
        "pt_br" | "pt" => Locale::pt_BR,
        "pt_pt" => Locale::pt_PT,
        "en" | "en_us" => Locale::en_US,
        "en_gb" => Locale::en_GB,
        "es" | "es_es" => Locale::es_ES,
        "fr" | "fr_fr" => Locale::fr_FR,
        "de" | "de_de" => Locale::de_DE,
        "it" | "it_it" => Locale::it_IT,
        _ => return None,
    };
    Some(locale)
}

/// Locale- and timezone-aware date formatter
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// Build a formatter; `None` when the language or timezone is unknown
    pub fn new(format: &str, language: &str, timezone: &str) -> Option<Self> {
        Some(Self {
            format: format.to_string(),
            locale: locale_for(language)?,
            timezone: timezone.parse().ok()?,
        })
    }

    /// Format a timestamp for display, e.g. `25 mar 2021` for pt-BR
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        let local = date.with_timezone(&self.timezone);
        let mut out = String::new();
        if write!(out, "{}", local.format_localized(&self.format, self.locale)).is_err() {
            tracing::warn!("Invalid date_format {:?}, using ISO date", self.format);
            return local.format("%Y-%m-%d").to_string();
        }
        out
    }
}

/// Format a date in ISO 8601 / XML format (for `<time datetime>`)
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
