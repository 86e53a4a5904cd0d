//! Publish-date normalization.
//!
//! Feeds are careless with `pubDate`. We try the strict RFC 1123/2822 form
//! first, then a looser reading of the same layout (weekday ignored, zone
//! abbreviation optional), and finally RFC 3339. Anything else is reported
//! as "no timestamp" rather than an error so a single bad date never costs
//! us the item.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const LOOSE_FORMATS: [&str; 2] = ["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"];

/// Normalize a feed-supplied date string into UTC.
///
/// Returns `None` for empty input or when no supported format matches.
pub fn normalize_pub_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_loose(input) {
        return Some(dt);
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_loose(input: &str) -> Option<DateTime<Utc>> {
    let rest = match input.split_once(',') {
        Some((weekday, rest)) if weekday.trim().chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => input,
    };

    let mut tokens: Vec<&str> = rest.split_whitespace().collect();
    let offset_secs = match tokens.last().copied() {
        Some(zone) if zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            tokens.pop();
            zone_abbreviation_offset(zone)
        }
        Some(zone) => match numeric_offset(zone) {
            Some(secs) => {
                tokens.pop();
                secs
            }
            None => 0,
        },
        None => return None,
    };

    let text = tokens.join(" ");
    let naive = LOOSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())?;

    FixedOffset::east_opt(offset_secs)?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offset for a zone abbreviation. Unknown names are read as UTC.
fn zone_abbreviation_offset(zone: &str) -> i32 {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    hours * 3600
}

/// Parse `+hhmm` / `-hhmm`.
fn numeric_offset(zone: &str) -> Option<i32> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_numeric_offset_form() {
        assert_eq!(
            normalize_pub_date("Mon, 02 Jan 2006 15:04:05 -0700"),
            Some(utc("2006-01-02T22:04:05Z"))
        );
    }

    #[test]
    fn test_named_zone_form() {
        assert_eq!(
            normalize_pub_date("Mon, 02 Jan 2006 15:04:05 GMT"),
            Some(utc("2006-01-02T15:04:05Z"))
        );
        assert_eq!(
            normalize_pub_date("Mon, 02 Jan 2006 10:04:05 EST"),
            Some(utc("2006-01-02T15:04:05Z"))
        );
    }

    #[test]
    fn test_loose_form_ignores_weekday() {
        // 2006-01-02 was a Monday.
        assert_eq!(
            normalize_pub_date("Tue, 02 Jan 2006 15:04:05 GMT"),
            Some(utc("2006-01-02T15:04:05Z"))
        );
        assert_eq!(
            normalize_pub_date("Fri, 02 Jan 2006 15:04:05 -0700"),
            Some(utc("2006-01-02T22:04:05Z"))
        );
    }

    #[test]
    fn test_loose_form_without_zone_or_seconds() {
        assert_eq!(
            normalize_pub_date("02 Jan 2006 15:04"),
            Some(utc("2006-01-02T15:04:00Z"))
        );
        assert_eq!(
            normalize_pub_date("Mon, 2 Jan 2006 15:04:05"),
            Some(utc("2006-01-02T15:04:05Z"))
        );
    }

    #[test]
    fn test_unknown_abbreviation_is_utc() {
        assert_eq!(
            normalize_pub_date("Mon, 02 Jan 2006 15:04:05 XYZT"),
            Some(utc("2006-01-02T15:04:05Z"))
        );
    }

    #[test]
    fn test_rfc3339_form() {
        assert_eq!(
            normalize_pub_date("2006-01-02T15:04:05+02:00"),
            Some(utc("2006-01-02T13:04:05Z"))
        );
    }

    #[test]
    fn test_rendered_dates_round_trip() {
        let original = utc("2024-03-10T08:30:00Z");
        assert_eq!(normalize_pub_date(&original.to_rfc2822()), Some(original));

        let rendered = original
            .with_timezone(&FixedOffset::east_opt(-5 * 3600).unwrap())
            .format("%a, %d %b %Y %H:%M:%S %z")
            .to_string();
        assert_eq!(normalize_pub_date(&rendered), Some(original));
    }

    #[test]
    fn test_missing_or_garbage_dates_are_absent() {
        assert_eq!(normalize_pub_date(""), None);
        assert_eq!(normalize_pub_date("   "), None);
        assert_eq!(normalize_pub_date("yesterday"), None);
        assert_eq!(normalize_pub_date("Mon, 45 Foo 2006 99:99:99 GMT"), None);
        assert_eq!(normalize_pub_date(","), None);
    }

    #[test]
    fn test_numeric_offset_parsing() {
        assert_eq!(numeric_offset("+0130"), Some(5400));
        assert_eq!(numeric_offset("-0700"), Some(-25200));
        assert_eq!(numeric_offset("0700"), None);
        assert_eq!(numeric_offset("+07"), None);
    }
}
