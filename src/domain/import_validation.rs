use thiserror::Error;

use crate::domain::models::ChargingSession;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ImportValidationError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

// A zero or NaN total counts as missing.
pub fn validate_for_import(session: &ChargingSession) -> Result<(), ImportValidationError> {
    if session.session_id.trim().is_empty() {
        return Err(ImportValidationError::MissingRequiredField("session_id"));
    }

    if session.total_cost == 0.0 || session.total_cost.is_nan() {
        return Err(ImportValidationError::MissingRequiredField("total_cost"));
    }

    Ok(())
}
