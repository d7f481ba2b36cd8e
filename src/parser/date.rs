//! Date parsing: envelope `Date:` headers and localized quote-attribution dates.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use tracing::warn;

fn japanese_date_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日.*?(\d{1,2}):(\d{2})")
            .expect("valid japanese date regex")
    })
}

fn slash_date_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)(\d{1,4})/(\d{1,2})/(\d{1,4})\D*?(\d{1,2}):(\d{2})(?::\d{2})?\s*(AM|PM|午前|午後)?",
        )
        .expect("valid slash date regex")
    })
}

/// Normalize the date text of a quote attribution line to an absolute timestamp.
///
/// Tried in order:
/// 1. `YYYY年M月D日(曜) H:MM`
/// 2. `YYYY/M/D H:MM` (also `M/D/YYYY H:MM [AM|PM]`)
/// 3. freeform parsing via [`parse_date_in`]
///
/// Forms without a zone are read in `local_offset`. `None` means "timestamp
/// unknown"; callers fall back to the envelope date.
pub fn normalize_quote_date(raw: &str, local_offset: FixedOffset) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // A matched localized form is authoritative: an impossible calendar date is
    // "unknown", not a reason to try looser parsers.
    if let Some(caps) = japanese_date_re().captures(trimmed) {
        let num = |i: usize| caps[i].parse::<u32>().ok();
        return build_local(
            i32::try_from(num(1)?).ok()?,
            num(2)?,
            num(3)?,
            num(4)?,
            num(5)?,
            local_offset,
        );
    }

    if let Some(caps) = slash_date_re().captures(trimmed) {
        let num = |i: usize| caps[i].parse::<u32>().ok();
        let (a, b, c) = (num(1)?, num(2)?, num(3)?);
        // Year first when the first field has four digits, else US month/day/year
        let (year, month, day) = if caps[1].len() == 4 { (a, b, c) } else { (c, a, b) };
        let mut hour = num(4)?;
        match caps.get(6).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(ref p) if (p == "PM" || p == "午後") && hour < 12 => hour += 12,
            Some(ref p) if (p == "AM" || p == "午前") && hour == 12 => hour = 0,
            _ => {}
        }
        return build_local(
            i32::try_from(year).ok()?,
            month,
            day,
            hour,
            num(5)?,
            local_offset,
        );
    }

    parse_date_in(trimmed, local_offset)
}

fn build_local(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    offset: FixedOffset,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an email date string in various common formats, as UTC when no zone is given.
///
/// Supports RFC 2822, ISO 8601, and many broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    parse_date_in(date_str, Utc.fix())
}

/// Parse a freeform date; values without a zone are read in `local_offset`.
pub fn parse_date_in(date_str: &str, local_offset: FixedOffset) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Remove leading day-of-week: "Thu, " or "Thu "
    let no_dow = strip_day_of_week(trimmed);

    // IMAP-style: "16-JUL-2025 03:01:03" → normalize to "16 Jul 2025 03:01:03"
    let no_dow_normalized = normalize_imap_date(&no_dow);

    // Gmail English attribution: "Feb 19, 2026 at 3:47 PM" → "Feb 19, 2026 3:47 PM"
    let no_at = no_dow.replace(" at ", " ");

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M",
        "%b %d %H:%M:%S %Y",
        "%b %d, %Y %I:%M %p",
        "%b %d, %Y %H:%M",
        "%B %d, %Y %I:%M %p",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for candidate in [&no_dow, &no_dow_normalized, &no_at] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                if let Some(dt) = local_offset.from_local_datetime(&ndt).single() {
                    return Some(dt.with_timezone(&Utc));
                }
            }
        }
    }

    // Replace named timezones with offsets and try again
    for candidate in [&no_dow, &no_dow_normalized] {
        let replaced = replace_named_tz(candidate);
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&replaced, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    // Wrap input in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Date: {input}\n\n");
    let parser = MessageParser::default();
    let parsed = parser.parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Normalize IMAP-style dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    if !s.contains('-') {
        return s.to_string();
    }

    let months = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    let title_months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    for (i, month) in months.iter().enumerate() {
        for pattern in [format!("-{month}-"), format!("-{}-", month.to_lowercase())] {
            if s.contains(&pattern) {
                return s.replacen(&pattern, &format!(" {} ", title_months[i]), 1);
            }
        }
    }

    s.to_string()
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn utc_string(dt: Option<DateTime<Utc>>) -> String {
        dt.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_japanese_date_with_weekday() {
        let dt = normalize_quote_date("2026年2月19日(木) 15:47", jst());
        assert_eq!(utc_string(dt), "2026-02-19 06:47");
    }

    #[test]
    fn test_japanese_date_full_width_parens() {
        let dt = normalize_quote_date("2026年12月1日（火） 9:05", jst());
        assert_eq!(utc_string(dt), "2026-12-01 00:05");
    }

    #[test]
    fn test_slash_date_year_first() {
        let dt = normalize_quote_date("2026/2/19 15:47", jst());
        assert_eq!(utc_string(dt), "2026-02-19 06:47");
    }

    #[test]
    fn test_slash_date_us_order_pm() {
        let dt = normalize_quote_date("2/19/2026 3:47 PM", Utc.fix());
        assert_eq!(utc_string(dt), "2026-02-19 15:47");
    }

    #[test]
    fn test_gmail_english_freeform() {
        let dt = normalize_quote_date("Thu, Feb 19, 2026 at 3:47 PM", Utc.fix());
        assert_eq!(utc_string(dt), "2026-02-19 15:47");
    }

    #[test]
    fn test_invalid_calendar_date_is_unknown() {
        assert!(normalize_quote_date("2026年2月30日 10:00", jst()).is_none());
        assert!(normalize_quote_date("someday soon", jst()).is_none());
        assert!(normalize_quote_date("", jst()).is_none());
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000");
        assert_eq!(utc_string(dt), "2024-01-04 10:00");
    }

    #[test]
    fn test_parse_date_named_tz() {
        let dt = parse_date("2024-01-04 10:00:00 JST");
        assert_eq!(utc_string(dt), "2024-01-04 01:00");
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
    }

    #[test]
    fn test_parse_date_imap_style() {
        let dt = parse_date("16-JUL-2025 03:01:03");
        assert_eq!(utc_string(dt), "2025-07-16 03:01");
    }

    #[test]
    fn test_normalize_imap_date() {
        assert_eq!(
            normalize_imap_date("16-JUL-2025 03:01:03"),
            "16 Jul 2025 03:01:03"
        );
        assert_eq!(
            normalize_imap_date("04 Jan 2024 10:00:00"),
            "04 Jan 2024 10:00:00"
        );
    }
}
