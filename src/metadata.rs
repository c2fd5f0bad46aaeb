//! Derived metadata – the small record projected from a content tree before
//! rendering.
//!
//! Derivation never reads the clock. Anything time-dependent (the countdown
//! target) is computed from dates already in the content, once, and shipped to
//! the client inside the data payload so both sides render from the same
//! values.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::content::{lookup_str, ContentTree};

/// Values every template can bind to under `meta.*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetadata {
    pub title: String,
    pub slug: String,
    pub locale: Locale,
    /// ISO `YYYY-MM-DD`, or `None` when the content has no valid date.
    pub event_date: Option<String>,
    /// Long human-readable form, e.g. `Minggu, 23 November 2025`.
    pub event_date_display: Option<String>,
    /// Local `YYYY-MM-DDTHH:MM:00` the countdown ticks toward.
    pub countdown_target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Id,
    En,
}

impl Locale {
    pub fn from_content(content: &ContentTree) -> Self {
        match lookup_str(content, "locale") {
            Some(l) if l.eq_ignore_ascii_case("en") => Locale::En,
            _ => Locale::Id,
        }
    }

    /// BCP 47 tag, as used in `<html lang>`.
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Id => "id",
            Locale::En => "en",
        }
    }

    fn weekday(self, day: Weekday) -> &'static str {
        const ID: [&str; 7] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu"];
        const EN: [&str; 7] = [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ];
        let idx = day.num_days_from_monday() as usize;
        match self {
            Locale::Id => ID[idx],
            Locale::En => EN[idx],
        }
    }

    fn month(self, month0: u32) -> &'static str {
        const ID: [&str; 12] = [
            "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus",
            "September", "Oktober", "November", "Desember",
        ];
        const EN: [&str; 12] = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        let idx = month0 as usize % 12;
        match self {
            Locale::Id => ID[idx],
            Locale::En => EN[idx],
        }
    }
}

/// Per-template title rule. Receives the content and must be pure.
pub type TitleFn = fn(&ContentTree) -> String;

/// Project `content` into [`DerivedMetadata`] using `title_of` for the title.
pub fn derive(content: &ContentTree, title_of: TitleFn) -> DerivedMetadata {
    let locale = Locale::from_content(content);
    let title = {
        let t = title_of(content);
        if t.trim().is_empty() {
            "Invitation".to_string()
        } else {
            t
        }
    };
    let date = lookup_str(content, "eventDate").and_then(parse_date);
    let time = lookup_str(content, "eventTime")
        .and_then(parse_time)
        .unwrap_or_default();

    DerivedMetadata {
        slug: slugify(&title),
        event_date: date.map(|d| d.format("%Y-%m-%d").to_string()),
        event_date_display: date.map(|d| format_long_date(d, locale)),
        countdown_target: date.map(|d| d.and_time(time).format("%Y-%m-%dT%H:%M:00").to_string()),
        locale,
        title,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H.%M"))
        .ok()
}

/// `Minggu, 23 November 2025` / `Sunday, 23 November 2025`.
pub fn format_long_date(date: NaiveDate, locale: Locale) -> String {
    format!(
        "{}, {} {} {}",
        locale.weekday(date.weekday()),
        date.day(),
        locale.month(date.month0()),
        date.year()
    )
}

/// Lowercase ASCII slug; runs of anything else collapse to one `-`.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "invitation".to_string()
    } else {
        slug
    }
}
