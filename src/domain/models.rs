use serde::{Deserialize, Serialize};

/// A charging session as read off a receipt, before it has a row id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargingSession {
    pub provider: String,
    pub evse_id: String,
    pub location_name: String,
    pub location_address: String,
    pub transaction_start: Option<String>,
    pub transaction_end: Option<String>,
    pub duration_minutes: f64,
    pub total_energy_kwh: f64,
    pub maximum_power_kw: f64,
    pub total_cost: f64,
    pub energy_cost: f64,
    pub time_cost: f64,
    pub session_id: String,
}

impl ChargingSession {
    pub fn empty_for(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSession {
    pub id: i64,
    #[serde(flatten)]
    pub session: ChargingSession,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMileageRecord {
    pub odometer_reading: i64,
    pub recorded_date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MileageRecord {
    pub id: i64,
    pub odometer_reading: i64,
    pub recorded_date: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub export_date: String,
    pub sessions: Vec<StoredSession>,
    pub mileage_records: Vec<MileageRecord>,
}
