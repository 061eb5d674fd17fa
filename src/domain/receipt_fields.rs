use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::domain::models::ChargingSession;

lazy_static! {
    static ref DURATION_PATTERN: Regex =
        Regex::new(r"([0-9]+) hr ([0-9]+) min ([0-9]+) sec").unwrap();
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    EvseId,
    LocationName,
    LocationAddress,
    TransactionStart,
    TransactionEnd,
    TransactionDuration,
    TotalEnergy,
    MaximumPower,
    TotalPrice,
    SessionId,
}

#[derive(Clone, Copy)]
struct Label {
    prefix: &'static str,
    field: Field,
}

const LABELS: &[Label] = &[
    Label {
        prefix: "EVSE ID:",
        field: Field::EvseId,
    },
    Label {
        prefix: "Location Name:",
        field: Field::LocationName,
    },
    Label {
        prefix: "Location Address:",
        field: Field::LocationAddress,
    },
    Label {
        prefix: "Transaction Start:",
        field: Field::TransactionStart,
    },
    Label {
        prefix: "Transaction End:",
        field: Field::TransactionEnd,
    },
    Label {
        prefix: "Transaction Duration:",
        field: Field::TransactionDuration,
    },
    Label {
        prefix: "Total Energy:",
        field: Field::TotalEnergy,
    },
    Label {
        prefix: "Maximum Power:",
        field: Field::MaximumPower,
    },
    Label {
        prefix: "Total Price:",
        field: Field::TotalPrice,
    },
    Label {
        prefix: "Session ID:",
        field: Field::SessionId,
    },
];

const ENERGY_UNIT_SUFFIX: &str = " kWh";
const AC_POWER_SUFFIX: &str = " kW (AC)";
const CURRENCY_SYMBOL: &str = "$";

// Offset-aware shapes, tried before any naive interpretation.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z"];

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%b %d %Y %I:%M:%S %p",
    "%b %d %Y %I:%M %p",
    "%B %d %Y %I:%M:%S %p",
    "%B %d %Y %I:%M %p",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d %Y", "%B %d %Y"];

const NAMED_ZONES: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

pub fn normalize_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// A label seen twice overwrites the earlier value.
pub fn extract_labeled_fields(session: &mut ChargingSession, lines: &[&str]) {
    for line in lines {
        let Some((field, remainder)) = match_label(line) else {
            continue;
        };
        apply_field(session, field, remainder.trim());
    }
}

fn match_label(line: &str) -> Option<(Field, &str)> {
    LABELS.iter().find_map(|label| {
        line.strip_prefix(label.prefix)
            .map(|remainder| (label.field, remainder))
    })
}

fn apply_field(session: &mut ChargingSession, field: Field, value: &str) {
    match field {
        Field::EvseId => session.evse_id = value.to_string(),
        Field::LocationName => session.location_name = value.to_string(),
        Field::LocationAddress => session.location_address = value.to_string(),
        Field::TransactionStart => session.transaction_start = parse_timestamp(value),
        Field::TransactionEnd => session.transaction_end = parse_timestamp(value),
        Field::TransactionDuration => session.duration_minutes = parse_duration_minutes(value),
        Field::TotalEnergy => {
            session.total_energy_kwh = parse_number_without(value, ENERGY_UNIT_SUFFIX)
        }
        Field::MaximumPower => {
            session.maximum_power_kw = parse_number_without(value, AC_POWER_SUFFIX)
        }
        Field::TotalPrice => session.total_cost = parse_number_without(value, CURRENCY_SYMBOL),
        Field::SessionId => session.session_id = value.to_string(),
    }
}

pub fn parse_duration_minutes(text: &str) -> f64 {
    duration_parts(text)
        .map(|(hours, minutes, seconds)| hours * 60.0 + minutes + seconds / 60.0)
        .unwrap_or(0.0)
}

fn duration_parts(text: &str) -> Option<(f64, f64, f64)> {
    let captures = DURATION_PATTERN.captures(text)?;
    let part = |index: usize| captures.get(index)?.as_str().parse::<f64>().ok();

    Some((part(1)?, part(2)?, part(3)?))
}

fn parse_number_without(value: &str, unit: &str) -> f64 {
    parse_leading_f64(&value.replacen(unit, "", 1)).unwrap_or(0.0)
}

pub fn parse_leading_f64(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(text)
        .and_then(|token| token.as_str().trim().parse::<f64>().ok())
}

/// Times without an offset or a known zone name are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = parse_zoned(trimmed).or_else(|| {
        let (normalized, offset) = normalize_date_text(trimmed);
        parse_naive(&normalized, offset)
    });

    if parsed.is_none() {
        tracing::debug!(input = %trimmed, "receipt timestamp not recognized");
    }

    parsed.map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_zoned(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }

    ZONED_FORMATS.iter().find_map(|format| {
        DateTime::parse_from_str(text, format)
            .ok()
            .map(|datetime| datetime.with_timezone(&Utc))
    })
}

fn parse_naive(text: &str, offset: Option<FixedOffset>) -> Option<DateTime<Utc>> {
    let date_time = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_ONLY_FORMATS.iter().find_map(|format| {
                NaiveDate::parse_from_str(text, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
        })?;

    match offset {
        Some(offset) => date_time
            .and_local_timezone(offset)
            .single()
            .map(|datetime| datetime.with_timezone(&Utc)),
        None => Some(date_time.and_utc()),
    }
}

// A known zone name becomes its fixed offset; any other trailing
// abbreviation is dropped and the time read as UTC.
fn normalize_date_text(text: &str) -> (String, Option<FixedOffset>) {
    let mut tokens: Vec<&str> = text
        .split(|char: char| char.is_whitespace() || char == ',')
        .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("at"))
        .collect();

    let mut offset = None;
    if let Some(last) = tokens.last() {
        if let Some(named) = named_zone_offset(last) {
            offset = Some(named);
            tokens.pop();
        } else if is_zone_abbreviation(last) {
            tokens.pop();
        }
    }

    (tokens.join(" "), offset)
}

fn named_zone_offset(token: &str) -> Option<FixedOffset> {
    NAMED_ZONES
        .iter()
        .find(|(name, _)| *name == token)
        .and_then(|(_, hours)| FixedOffset::east_opt(hours * 3600))
}

fn is_zone_abbreviation(token: &str) -> bool {
    (2..=5).contains(&token.len())
        && token.chars().all(|char| char.is_ascii_uppercase())
        && token != "AM"
        && token != "PM"
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        extract_labeled_fields, normalize_lines, parse_duration_minutes, parse_leading_f64,
        parse_timestamp,
    };
    use crate::domain::models::ChargingSession;

    fn extract(text: &str) -> ChargingSession {
        let mut session = ChargingSession::empty_for("AmpUp");
        extract_labeled_fields(&mut session, &normalize_lines(text));
        session
    }

    #[test]
    fn normalizes_lines_by_trimming_and_dropping_blanks() {
        let lines = normalize_lines("  EVSE ID: E1  \n\n\t\nSession ID: S1\r\n   ");

        assert_eq!(lines, vec!["EVSE ID: E1", "Session ID: S1"]);
    }

    #[test]
    fn extracts_text_fields_and_trims_values() {
        let session = extract(
            "EVSE ID:   E123  \nLocation Name: Main St Garage\nLocation Address: 1 Main St, Springfield\nSession ID: S999",
        );

        assert_eq!(session.evse_id, "E123");
        assert_eq!(session.location_name, "Main St Garage");
        assert_eq!(session.location_address, "1 Main St, Springfield");
        assert_eq!(session.session_id, "S999");
    }

    #[test]
    fn extracts_numeric_fields_with_units_removed() {
        let session = extract(
            "Total Energy: 10.50 kWh\nMaximum Power: 7.2 kW (AC)\nTotal Price: $12.34",
        );

        assert_eq!(session.total_energy_kwh, 10.5);
        assert_eq!(session.maximum_power_kw, 7.2);
        assert_eq!(session.total_cost, 12.34);
    }

    #[test]
    fn last_occurrence_of_a_label_wins() {
        let session = extract("Session ID: first\nSession ID: second");

        assert_eq!(session.session_id, "second");
    }

    #[test]
    fn ignores_unknown_and_differently_cased_labels() {
        let session = extract("Charger Type: Level 2\nsession id: lower\nTOTAL PRICE: $9.99");

        assert_eq!(session, ChargingSession::empty_for("AmpUp"));
    }

    #[test]
    fn label_must_start_the_line() {
        let session = extract("Receipt Session ID: S1");

        assert_eq!(session.session_id, "");
    }

    #[test]
    fn unparsable_numbers_default_to_zero() {
        let session = extract("Total Energy: n/a\nTotal Price: free");

        assert_eq!(session.total_energy_kwh, 0.0);
        assert_eq!(session.total_cost, 0.0);
    }

    #[test]
    fn converts_full_duration_to_fractional_minutes() {
        assert_eq!(parse_duration_minutes("1 hr 23 min 45 sec"), 83.75);
        assert_eq!(parse_duration_minutes("0 hr 0 min 30 sec"), 0.5);
    }

    #[test]
    fn partial_duration_yields_zero() {
        assert_eq!(parse_duration_minutes("23 min"), 0.0);
        assert_eq!(parse_duration_minutes("5 min 30 sec"), 0.0);
        assert_eq!(parse_duration_minutes("2 hr 15 min"), 0.0);
        assert_eq!(parse_duration_minutes(""), 0.0);
    }

    #[test]
    fn non_ascii_digits_do_not_count_as_duration() {
        assert_eq!(parse_duration_minutes("\u{0661} hr 23 min 45 sec"), 0.0);
        assert_eq!(parse_duration_minutes("1 hr \u{0662}3 min 45 sec"), 0.0);
        assert_eq!(parse_leading_f64("\u{0661}0 kWh"), None);
    }

    #[test]
    fn leading_number_ignores_trailing_text() {
        assert_eq!(parse_leading_f64("10.50kWh"), Some(10.5));
        assert_eq!(parse_leading_f64("  -3"), Some(-3.0));
        assert_eq!(parse_leading_f64(".5 kW"), Some(0.5));
        assert_eq!(parse_leading_f64("kWh 10"), None);
    }

    #[test]
    fn normalizes_rfc3339_timestamps_to_utc() {
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00-08:00").as_deref(),
            Some("2024-01-15T22:30:00.000Z")
        );
    }

    #[test]
    fn parses_month_name_timestamps_as_utc() {
        assert_eq!(
            parse_timestamp("Jan 15, 2024 2:30:45 PM").as_deref(),
            Some("2024-01-15T14:30:45.000Z")
        );
    }

    #[test]
    fn named_us_zones_apply_their_offset() {
        assert_eq!(
            parse_timestamp("January 15, 2024, 2:30 PM PST").as_deref(),
            Some("2024-01-15T22:30:00.000Z")
        );
        assert_eq!(
            parse_timestamp("Jul 4, 2024 at 9:15 AM EDT").as_deref(),
            Some("2024-07-04T13:15:00.000Z")
        );
        assert_eq!(
            parse_timestamp("01/15/2024 02:30 PM GMT").as_deref(),
            Some("2024-01-15T14:30:00.000Z")
        );
    }

    #[test]
    fn unknown_zone_abbreviation_is_read_as_utc() {
        assert_eq!(
            parse_timestamp("Jan 15, 2024 2:30 PM AEST").as_deref(),
            Some("2024-01-15T14:30:00.000Z")
        );
    }

    #[test]
    fn parses_numeric_us_timestamps() {
        assert_eq!(
            parse_timestamp("01/15/2024 02:30:45 PM").as_deref(),
            Some("2024-01-15T14:30:45.000Z")
        );
        assert_eq!(
            parse_timestamp("1/5/2024 09:05").as_deref(),
            Some("2024-01-05T09:05:00.000Z")
        );
    }

    #[test]
    fn date_only_text_maps_to_midnight() {
        assert_eq!(
            parse_timestamp("2024-03-01").as_deref(),
            Some("2024-03-01T00:00:00.000Z")
        );
    }

    #[test]
    fn unparsable_timestamps_become_none() {
        assert_eq!(parse_timestamp("sometime yesterday"), None);
        assert_eq!(parse_timestamp(""), None);

        let session = extract("Transaction Start: not a date");
        assert_eq!(session.transaction_start, None);
    }
}
