use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db;
use crate::adapters::db::{DbError, ReplaceSummary};
use crate::domain::efficiency::{
    EfficiencyMetrics, SessionStats, compute_efficiency, summarize_sessions,
};
use crate::domain::import_validation::ImportValidationError;
use crate::domain::models::{
    ChargingSession, DataExport, MileageRecord, NewMileageRecord, StoredSession,
};
use crate::domain::receipt_parser::ReceiptError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
    #[error("{0}")]
    Receipt(#[from] ReceiptError),
    #[error("{0}")]
    Validation(#[from] ImportValidationError),
    #[error("charging session {session_id} from {provider} has already been recorded")]
    DuplicateSession {
        provider: String,
        session_id: String,
    },
    #[error("receipt text is empty")]
    EmptyReceipt,
    #[error("odometer_reading must be a non-negative integer, got {0}")]
    InvalidOdometer(i64),
    #[error("odometer reading {reading} is less than the latest reading {latest}")]
    OdometerRegression { reading: i64, latest: i64 },
    #[error("recorded_date must be a YYYY-MM-DD date, got {0:?}")]
    InvalidRecordedDate(String),
}

pub trait SessionQueryHandler {
    fn list_sessions(&self) -> Result<Vec<StoredSession>, ServiceError>;
    fn find_session(
        &self,
        provider: &str,
        session_id: &str,
    ) -> Result<Option<StoredSession>, ServiceError>;
    fn session_stats(&self) -> Result<SessionStats, ServiceError>;
    fn efficiency_metrics(&self) -> Result<EfficiencyMetrics, ServiceError>;
    fn export_data(&self) -> Result<DataExport, ServiceError>;
    fn get_schema_version(&self) -> Result<u32, ServiceError>;
    fn count_sessions(&self) -> Result<i64, ServiceError>;
}

pub trait SessionCommandHandler {
    fn insert_session(&self, session: &ChargingSession) -> Result<i64, ServiceError>;
    fn delete_session(&self, id: i64) -> Result<bool, ServiceError>;
    fn replace_all(
        &self,
        sessions: &[ChargingSession],
        mileage: &[NewMileageRecord],
    ) -> Result<ReplaceSummary, ServiceError>;
}

pub trait MileageQueryHandler {
    fn list_mileage_records(&self) -> Result<Vec<MileageRecord>, ServiceError>;
    fn get_latest_mileage(&self) -> Result<Option<MileageRecord>, ServiceError>;
}

pub trait MileageCommandHandler {
    fn add_mileage_record(&self, record: &NewMileageRecord) -> Result<i64, ServiceError>;
    fn update_mileage_record(
        &self,
        id: i64,
        record: &NewMileageRecord,
    ) -> Result<bool, ServiceError>;
    fn delete_mileage_record(&self, id: i64) -> Result<bool, ServiceError>;
}

#[derive(Clone)]
pub struct SqliteLedgerService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T, E>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, ServiceError>
    where
        E: Into<ServiceError>,
    {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&connection).map_err(Into::into)
    }

    fn with_connection_mut<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, DbError>,
    ) -> Result<T, ServiceError> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&mut connection).map_err(ServiceError::from)
    }
}

impl SessionQueryHandler for SqliteLedgerService {
    fn list_sessions(&self) -> Result<Vec<StoredSession>, ServiceError> {
        self.with_connection(db::list_sessions)
    }

    fn find_session(
        &self,
        provider: &str,
        session_id: &str,
    ) -> Result<Option<StoredSession>, ServiceError> {
        self.with_connection(|connection| db::find_session(connection, provider, session_id))
    }

    fn session_stats(&self) -> Result<SessionStats, ServiceError> {
        let totals = self.with_connection(db::efficiency_totals)?;
        Ok(summarize_sessions(&totals))
    }

    fn efficiency_metrics(&self) -> Result<EfficiencyMetrics, ServiceError> {
        let totals = self.with_connection(db::efficiency_totals)?;
        Ok(compute_efficiency(&totals))
    }

    fn export_data(&self) -> Result<DataExport, ServiceError> {
        let (sessions, mileage_records) = self.with_connection(db::export_all)?;
        Ok(DataExport {
            export_date: timestamp_now(),
            sessions,
            mileage_records,
        })
    }

    fn get_schema_version(&self) -> Result<u32, ServiceError> {
        self.with_connection(db::schema_version)
    }

    fn count_sessions(&self) -> Result<i64, ServiceError> {
        self.with_connection(db::count_sessions)
    }
}

impl SessionCommandHandler for SqliteLedgerService {
    fn insert_session(&self, session: &ChargingSession) -> Result<i64, ServiceError> {
        let created_at = timestamp_now();
        self.with_connection(|connection| db::insert_session(connection, session, &created_at))
            .map_err(lift_duplicate)
    }

    fn delete_session(&self, id: i64) -> Result<bool, ServiceError> {
        self.with_connection(|connection| db::delete_session(connection, id))
    }

    fn replace_all(
        &self,
        sessions: &[ChargingSession],
        mileage: &[NewMileageRecord],
    ) -> Result<ReplaceSummary, ServiceError> {
        for record in mileage {
            validate_mileage(record)?;
        }

        let created_at = timestamp_now();
        self.with_connection_mut(|connection| {
            db::replace_all(connection, sessions, mileage, &created_at)
        })
    }
}

impl MileageQueryHandler for SqliteLedgerService {
    fn list_mileage_records(&self) -> Result<Vec<MileageRecord>, ServiceError> {
        self.with_connection(db::list_mileage_records)
    }

    fn get_latest_mileage(&self) -> Result<Option<MileageRecord>, ServiceError> {
        self.with_connection(db::get_latest_mileage)
    }
}

impl MileageCommandHandler for SqliteLedgerService {
    fn add_mileage_record(&self, record: &NewMileageRecord) -> Result<i64, ServiceError> {
        validate_mileage(record)?;

        let created_at = timestamp_now();
        self.with_connection(|connection| {
            if let Some(latest) = db::get_latest_mileage(connection)?
                && record.odometer_reading < latest.odometer_reading
            {
                return Err(ServiceError::OdometerRegression {
                    reading: record.odometer_reading,
                    latest: latest.odometer_reading,
                });
            }

            Ok(db::insert_mileage_record(connection, record, &created_at)?)
        })
    }

    fn update_mileage_record(
        &self,
        id: i64,
        record: &NewMileageRecord,
    ) -> Result<bool, ServiceError> {
        validate_mileage(record)?;

        let updated_at = timestamp_now();
        self.with_connection(|connection| {
            db::update_mileage_record(connection, id, record, &updated_at)
        })
    }

    fn delete_mileage_record(&self, id: i64) -> Result<bool, ServiceError> {
        self.with_connection(|connection| db::delete_mileage_record(connection, id))
    }
}

fn validate_mileage(record: &NewMileageRecord) -> Result<(), ServiceError> {
    if record.odometer_reading < 0 {
        return Err(ServiceError::InvalidOdometer(record.odometer_reading));
    }

    NaiveDate::parse_from_str(record.recorded_date.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::InvalidRecordedDate(record.recorded_date.clone()))?;

    Ok(())
}

fn lift_duplicate(error: ServiceError) -> ServiceError {
    match error {
        ServiceError::Database(DbError::DuplicateSession {
            provider,
            session_id,
        }) => ServiceError::DuplicateSession {
            provider,
            session_id,
        },
        other => other,
    }
}

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
