use serde::Serialize;

use crate::app::services::{ServiceError, SessionCommandHandler, SessionQueryHandler};
use crate::domain::import_validation::validate_for_import;
use crate::domain::models::ChargingSession;
use crate::domain::receipt_parser::{Provider, auto_parse, parse_as};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedSession {
    pub id: i64,
    pub session: ChargingSession,
}

pub fn preview_receipt(
    raw: &str,
    provider: Option<Provider>,
) -> Result<ChargingSession, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::EmptyReceipt);
    }

    let session = match provider {
        Some(provider) => parse_as(provider, raw)?,
        None => auto_parse(raw)?,
    };

    Ok(session)
}

pub fn import_receipt<S>(
    store: &S,
    raw: &str,
    provider: Option<Provider>,
) -> Result<ImportedSession, ServiceError>
where
    S: SessionQueryHandler + SessionCommandHandler,
{
    let session = preview_receipt(raw, provider)?;

    if let Err(error) = validate_for_import(&session) {
        tracing::warn!(
            provider = %session.provider,
            error = %error,
            "receipt rejected before persistence"
        );
        return Err(error.into());
    }

    if store
        .find_session(&session.provider, &session.session_id)?
        .is_some()
    {
        tracing::warn!(
            provider = %session.provider,
            session_id = %session.session_id,
            "receipt already imported"
        );
        return Err(ServiceError::DuplicateSession {
            provider: session.provider,
            session_id: session.session_id,
        });
    }

    let id = store.insert_session(&session)?;

    tracing::info!(
        id,
        provider = %session.provider,
        session_id = %session.session_id,
        total_cost = session.total_cost,
        total_energy_kwh = session.total_energy_kwh,
        "charging session imported"
    );

    Ok(ImportedSession { id, session })
}
