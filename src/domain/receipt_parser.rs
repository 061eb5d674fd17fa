use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::cost_breakdown::extract_cost_breakdown;
use crate::domain::models::ChargingSession;
use crate::domain::receipt_fields::{extract_labeled_fields, normalize_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    AmpUp,
    ElectrifyAmerica,
    ChargePoint,
    EVgo,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("unrecognized receipt format: provider unknown")]
    UnrecognizedFormat,
    #[error("{provider} receipt parser is not implemented")]
    NotImplemented { provider: Provider },
}

type ParseFn = fn(&str) -> Result<ChargingSession, ReceiptError>;

// Checked in order; the first keyword found in the lowercased text decides.
const PROVIDER_KEYWORDS: &[(&str, Provider)] = &[
    ("ampup", Provider::AmpUp),
    ("evse id:", Provider::AmpUp),
    ("electrify america", Provider::ElectrifyAmerica),
    ("chargepoint", Provider::ChargePoint),
    ("evgo", Provider::EVgo),
];

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::AmpUp,
        Provider::ElectrifyAmerica,
        Provider::ChargePoint,
        Provider::EVgo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Provider::AmpUp => "AmpUp",
            Provider::ElectrifyAmerica => "Electrify America",
            Provider::ChargePoint => "ChargePoint",
            Provider::EVgo => "EVgo",
        }
    }

    pub fn detect(raw: &str) -> Option<Provider> {
        let lowered = raw.to_lowercase();
        PROVIDER_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, provider)| *provider)
    }

    fn parser(self) -> ParseFn {
        match self {
            Provider::AmpUp => parse_ampup_receipt,
            Provider::ElectrifyAmerica => parse_electrify_america,
            Provider::ChargePoint => parse_chargepoint,
            Provider::EVgo => parse_evgo,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ReceiptError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_provider_name(value);
        Provider::ALL
            .into_iter()
            .find(|provider| normalize_provider_name(provider.name()) == wanted)
            .ok_or(ReceiptError::UnrecognizedFormat)
    }
}

fn normalize_provider_name(value: &str) -> String {
    value
        .chars()
        .filter(|char| char.is_ascii_alphanumeric())
        .flat_map(|char| char.to_lowercase())
        .collect()
}

// Missing fields stay at their empty defaults; required fields are checked on import.
pub fn parse_ampup(raw: &str) -> ChargingSession {
    let mut session = ChargingSession::empty_for(Provider::AmpUp.name());

    extract_labeled_fields(&mut session, &normalize_lines(raw));

    let breakdown = extract_cost_breakdown(raw);
    session.energy_cost = breakdown.energy_cost;
    session.time_cost = breakdown.time_cost;

    session
}

fn parse_ampup_receipt(raw: &str) -> Result<ChargingSession, ReceiptError> {
    Ok(parse_ampup(raw))
}

fn parse_electrify_america(_raw: &str) -> Result<ChargingSession, ReceiptError> {
    Err(ReceiptError::NotImplemented {
        provider: Provider::ElectrifyAmerica,
    })
}

fn parse_chargepoint(_raw: &str) -> Result<ChargingSession, ReceiptError> {
    Err(ReceiptError::NotImplemented {
        provider: Provider::ChargePoint,
    })
}

fn parse_evgo(_raw: &str) -> Result<ChargingSession, ReceiptError> {
    Err(ReceiptError::NotImplemented {
        provider: Provider::EVgo,
    })
}

pub fn parse_as(provider: Provider, raw: &str) -> Result<ChargingSession, ReceiptError> {
    (provider.parser())(raw)
}

pub fn auto_parse(raw: &str) -> Result<ChargingSession, ReceiptError> {
    let provider = Provider::detect(raw).ok_or(ReceiptError::UnrecognizedFormat)?;
    tracing::debug!(provider = %provider, "receipt provider detected");
    parse_as(provider, raw)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Provider, ReceiptError, auto_parse, parse_ampup, parse_as};
    use crate::domain::models::ChargingSession;

    const SAMPLE_RECEIPT: &str = "\
AmpUp Charging Receipt

EVSE ID: E123
Location Name: Riverside Lot
Location Address: 42 River Rd, Portland, OR
Transaction Start: Jan 15, 2024 2:30:00 PM
Transaction End: Jan 15, 2024 3:53:45 PM
Transaction Duration: 1 hr 23 min 45 sec
Total Energy: 10.50 kWh
Maximum Power: 7.2 kW (AC)

Price Breakdown
  Energy: $2.65
  Time (Charging): $0.50
Total Price: $3.15

Session ID: S999
";

    #[test]
    fn parses_full_ampup_receipt() {
        let session = parse_ampup(SAMPLE_RECEIPT);

        assert_eq!(
            session,
            ChargingSession {
                provider: "AmpUp".to_string(),
                evse_id: "E123".to_string(),
                location_name: "Riverside Lot".to_string(),
                location_address: "42 River Rd, Portland, OR".to_string(),
                transaction_start: Some("2024-01-15T14:30:00.000Z".to_string()),
                transaction_end: Some("2024-01-15T15:53:45.000Z".to_string()),
                duration_minutes: 83.75,
                total_energy_kwh: 10.5,
                maximum_power_kw: 7.2,
                total_cost: 3.15,
                energy_cost: 2.65,
                time_cost: 0.5,
                session_id: "S999".to_string(),
            }
        );
    }

    #[test]
    fn parses_minimal_receipt_fields() {
        let session = parse_ampup(
            "EVSE ID: E123\nTotal Energy: 10.50 kWh\nMaximum Power: 7.2 kW (AC)\nTotal Price: $3.15\nSession ID: S999",
        );

        assert_eq!(session.evse_id, "E123");
        assert_eq!(session.total_energy_kwh, 10.5);
        assert_eq!(session.maximum_power_kw, 7.2);
        assert_eq!(session.total_cost, 3.15);
        assert_eq!(session.session_id, "S999");
    }

    #[test]
    fn breakdown_is_found_regardless_of_line_order() {
        let session = parse_ampup(
            "Time (Charging): $1.50\nEVSE ID: E1\nEnergy: $5.00\nTotal Price: $6.50",
        );

        assert_eq!(session.energy_cost, 5.0);
        assert_eq!(session.time_cost, 1.5);
        assert_eq!(session.total_cost, 6.5);
    }

    #[test]
    fn truncated_receipt_degrades_to_defaults() {
        let session = parse_ampup("EVSE ID: E77\nTransaction Duration: 23 min");

        assert_eq!(session.provider, "AmpUp");
        assert_eq!(session.evse_id, "E77");
        assert_eq!(session.duration_minutes, 0.0);
        assert_eq!(session.session_id, "");
        assert_eq!(session.total_cost, 0.0);
        assert_eq!(session.transaction_start, None);
    }

    #[test]
    fn parsing_is_repeatable() {
        let first = parse_ampup(SAMPLE_RECEIPT);
        let second = parse_ampup(SAMPLE_RECEIPT);

        assert_eq!(
            serde_json::to_string(&first).expect("session should serialize"),
            serde_json::to_string(&second).expect("session should serialize")
        );
    }

    #[test]
    fn dispatcher_routes_ampup_by_keyword() {
        let by_name = auto_parse("Thanks for charging with AMPUP\nSession ID: A1")
            .expect("ampup receipt should parse");
        let by_evse = auto_parse("evse id: x\nSession ID: A2").expect("evse receipt should parse");

        assert_eq!(by_name.session_id, "A1");
        assert_eq!(by_evse.provider, "AmpUp");
    }

    #[test]
    fn dispatcher_rejects_unknown_text() {
        let result = auto_parse("Receipt\nTotal Price: $3.15\nSession ID: S1");

        assert_eq!(result, Err(ReceiptError::UnrecognizedFormat));
    }

    #[test]
    fn dispatcher_reports_unimplemented_vendors() {
        assert_eq!(
            auto_parse("Electrify America session summary"),
            Err(ReceiptError::NotImplemented {
                provider: Provider::ElectrifyAmerica
            })
        );
        assert_eq!(
            auto_parse("ChargePoint receipt"),
            Err(ReceiptError::NotImplemented {
                provider: Provider::ChargePoint
            })
        );
        assert_eq!(
            auto_parse("Powered by EVgo"),
            Err(ReceiptError::NotImplemented {
                provider: Provider::EVgo
            })
        );
    }

    #[test]
    fn ampup_keyword_takes_precedence() {
        let result = auto_parse("AmpUp station near the EVgo lot\nSession ID: S5");

        assert_eq!(result.map(|session| session.session_id), Ok("S5".to_string()));
    }

    #[test]
    fn explicit_provider_skips_detection() {
        let session = parse_as(Provider::AmpUp, "Session ID: S1\nTotal Price: $1.00")
            .expect("ampup parser should not fail");

        assert_eq!(session.session_id, "S1");
        assert_eq!(
            parse_as(Provider::EVgo, "Session ID: S1"),
            Err(ReceiptError::NotImplemented {
                provider: Provider::EVgo
            })
        );
    }

    #[test]
    fn provider_names_parse_loosely() {
        assert_eq!("ampup".parse::<Provider>(), Ok(Provider::AmpUp));
        assert_eq!(
            "electrify-america".parse::<Provider>(),
            Ok(Provider::ElectrifyAmerica)
        );
        assert_eq!("EVGO".parse::<Provider>(), Ok(Provider::EVgo));
        assert_eq!(
            "Tesla".parse::<Provider>(),
            Err(ReceiptError::UnrecognizedFormat)
        );
    }

    #[test]
    fn not_implemented_message_names_the_provider() {
        let error = ReceiptError::NotImplemented {
            provider: Provider::ChargePoint,
        };

        assert_eq!(error.to_string(), "ChargePoint receipt parser is not implemented");
    }
}
