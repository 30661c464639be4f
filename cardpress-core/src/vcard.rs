//! vCard 3.0 rendering for a single record.

use chrono::{DateTime, Utc};

use crate::record::UserRecord;

pub const PRODID: &str = "-//Digital Business Cards Management System//EN";
pub const DEFAULT_NOTE: &str =
    "Feel free to reach out through any channel, I look forward to working with you!";
pub const DEFAULT_COUNTRY: &str = "Taiwan";

/// Site-wide values that feed into every card.
#[derive(Debug, Clone)]
pub struct VCardOptions {
    /// Public base URL of the published site, without trailing slash.
    pub base_url: String,
    pub note: String,
    pub country: String,
}

impl Default for VCardOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            note: DEFAULT_NOTE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// `YYYYMMDDTHHMMSSZ`, as used by `REV`.
pub fn rev_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Family and given name: last and first whitespace-separated token.
pub fn name_components(full_name: &str) -> (&str, &str) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or("");
    let last = tokens.last().unwrap_or(first);
    (last, first)
}

/// Escape a TEXT value: backslash, comma, semicolon, and line breaks.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push_str("\\n");
                }
            }
            '\n' => out.push_str("\\n"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Strip every control character from a single-line value (URIs, email, phone).
pub fn single_line(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

/// `with_photo` says whether the record's photo was copied into `assets/`;
/// without it no `PHOTO` line is written.
pub fn render_vcard(
    record: &UserRecord,
    options: &VCardOptions,
    rev: DateTime<Utc>,
    with_photo: bool,
) -> String {
    let (family, given) = name_components(&record.full_name);
    let base_url = options.base_url.trim_end_matches('/');

    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("PRODID:{PRODID}"),
        format!("FN;CHARSET=UTF-8:{}", escape_text(&record.full_name)),
        format!(
            "N;CHARSET=UTF-8:{};{};;;",
            escape_text(family),
            escape_text(given)
        ),
        format!("ORG;CHARSET=UTF-8:{}", escape_text(&record.department)),
        format!("TITLE;CHARSET=UTF-8:{}", escape_text(&record.title)),
        format!("EMAIL;TYPE=work:{}", single_line(&record.email)),
    ];

    if let Some(phone) = non_empty(&record.phone) {
        lines.push(format!("TEL;TYPE=work,voice:{}", single_line(phone)));
    }
    if let Some(url) = non_empty(&record.linkedin_url) {
        lines.push(format!("URL;TYPE=work:{}", single_line(url)));
    }
    if let Some(url) = non_empty(&record.github_url) {
        lines.push(format!("URL;TYPE=work:{}", single_line(url)));
    }
    if let Some(address) = non_empty(&record.address) {
        lines.push(format!(
            "ADR;TYPE=work;CHARSET=UTF-8:;;{};;;;{}",
            escape_text(address),
            escape_text(&options.country)
        ));
    }
    if with_photo && non_empty(&record.photo_url).is_some() {
        lines.push(format!(
            "PHOTO;TYPE=JPEG:{}",
            single_line(&format!("{base_url}/assets/{}", record.photo_asset_name()))
        ));
    }

    lines.push(format!("NOTE;CHARSET=UTF-8:{}", escape_text(&options.note)));
    lines.push(format!("REV:{}", rev_timestamp(rev)));
    lines.push("END:VCARD".to_string());

    let mut card = lines.join("\n");
    card.push('\n');
    card
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
