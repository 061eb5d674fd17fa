use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use thiserror::Error;

use crate::domain::efficiency::EfficiencyTotals;
use crate::domain::models::{ChargingSession, MileageRecord, NewMileageRecord, StoredSession};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS charging_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    evse_id TEXT NOT NULL DEFAULT '',
    location_name TEXT NOT NULL DEFAULT '',
    location_address TEXT NOT NULL DEFAULT '',
    transaction_start TEXT,
    transaction_end TEXT,
    duration_minutes REAL NOT NULL DEFAULT 0,
    total_energy_kwh REAL NOT NULL DEFAULT 0,
    maximum_power_kw REAL NOT NULL DEFAULT 0,
    total_cost REAL NOT NULL DEFAULT 0,
    energy_cost REAL NOT NULL DEFAULT 0,
    time_cost REAL NOT NULL DEFAULT 0,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_charging_sessions_provider_session
ON charging_sessions (provider, session_id);

CREATE INDEX IF NOT EXISTS idx_charging_sessions_transaction_start_desc
ON charging_sessions (transaction_start DESC);

CREATE TABLE IF NOT EXISTS mileage_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    odometer_reading INTEGER NOT NULL,
    recorded_date TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mileage_date
ON mileage_records (recorded_date);
"#,
)];

const SESSION_COLUMNS: &str = "id, provider, evse_id, location_name, location_address,
    transaction_start, transaction_end, duration_minutes, total_energy_kwh,
    maximum_power_kw, total_cost, energy_cost, time_cost, session_id, created_at, updated_at";

const MILEAGE_COLUMNS: &str =
    "id, odometer_reading, recorded_date, notes, created_at, updated_at";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
    #[error("session {session_id} from {provider} already exists")]
    DuplicateSession {
        provider: String,
        session_id: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub imported_sessions: usize,
    pub imported_mileage: usize,
    pub skipped_sessions: usize,
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    Ok(StoredSession {
        id: row.get(0)?,
        session: ChargingSession {
            provider: row.get(1)?,
            evse_id: row.get(2)?,
            location_name: row.get(3)?,
            location_address: row.get(4)?,
            transaction_start: row.get(5)?,
            transaction_end: row.get(6)?,
            duration_minutes: row.get(7)?,
            total_energy_kwh: row.get(8)?,
            maximum_power_kw: row.get(9)?,
            total_cost: row.get(10)?,
            energy_cost: row.get(11)?,
            time_cost: row.get(12)?,
            session_id: row.get(13)?,
        },
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn mileage_from_row(row: &Row<'_>) -> rusqlite::Result<MileageRecord> {
    Ok(MileageRecord {
        id: row.get(0)?,
        odometer_reading: row.get(1)?,
        recorded_date: row.get(2)?,
        notes: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert_session(
    connection: &Connection,
    session: &ChargingSession,
    created_at: &str,
) -> Result<i64, DbError> {
    let result = connection.execute(
        "INSERT INTO charging_sessions (
            provider, evse_id, location_name, location_address,
            transaction_start, transaction_end, duration_minutes,
            total_energy_kwh, maximum_power_kw, total_cost,
            energy_cost, time_cost, session_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        params![
            session.provider,
            session.evse_id,
            session.location_name,
            session.location_address,
            session.transaction_start,
            session.transaction_end,
            session.duration_minutes,
            session.total_energy_kwh,
            session.maximum_power_kw,
            session.total_cost,
            session.energy_cost,
            session.time_cost,
            session.session_id,
            created_at,
        ],
    );

    match result {
        Ok(_) => Ok(connection.last_insert_rowid()),
        Err(error) if is_constraint_violation(&error) => Err(DbError::DuplicateSession {
            provider: session.provider.clone(),
            session_id: session.session_id.clone(),
        }),
        Err(error) => Err(DbError::from(error)),
    }
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

pub fn list_sessions(connection: &Connection) -> Result<Vec<StoredSession>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {SESSION_COLUMNS}
         FROM charging_sessions
         ORDER BY transaction_start DESC, id DESC"
    ))?;

    let rows = statement.query_map([], session_from_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?);
    }

    Ok(sessions)
}

pub fn find_session(
    connection: &Connection,
    provider: &str,
    session_id: &str,
) -> Result<Option<StoredSession>, DbError> {
    let session = connection
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS}
                 FROM charging_sessions
                 WHERE provider = ?1 AND session_id = ?2
                 LIMIT 1"
            ),
            params![provider, session_id],
            session_from_row,
        )
        .optional()?;

    Ok(session)
}

pub fn delete_session(connection: &Connection, id: i64) -> Result<bool, DbError> {
    let changed = connection.execute("DELETE FROM charging_sessions WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn count_sessions(connection: &Connection) -> Result<i64, DbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM charging_sessions", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

pub fn insert_mileage_record(
    connection: &Connection,
    record: &NewMileageRecord,
    created_at: &str,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO mileage_records (odometer_reading, recorded_date, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            record.odometer_reading,
            record.recorded_date,
            record.notes,
            created_at,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

pub fn update_mileage_record(
    connection: &Connection,
    id: i64,
    record: &NewMileageRecord,
    updated_at: &str,
) -> Result<bool, DbError> {
    let changed = connection.execute(
        "UPDATE mileage_records
         SET odometer_reading = ?1, recorded_date = ?2, notes = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            record.odometer_reading,
            record.recorded_date,
            record.notes,
            updated_at,
            id,
        ],
    )?;

    Ok(changed > 0)
}

pub fn delete_mileage_record(connection: &Connection, id: i64) -> Result<bool, DbError> {
    let changed = connection.execute("DELETE FROM mileage_records WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn list_mileage_records(connection: &Connection) -> Result<Vec<MileageRecord>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {MILEAGE_COLUMNS}
         FROM mileage_records
         ORDER BY recorded_date DESC, id DESC"
    ))?;

    let rows = statement.query_map([], mileage_from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }

    Ok(records)
}

pub fn get_latest_mileage(connection: &Connection) -> Result<Option<MileageRecord>, DbError> {
    let record = connection
        .query_row(
            &format!(
                "SELECT {MILEAGE_COLUMNS}
                 FROM mileage_records
                 ORDER BY recorded_date DESC, created_at DESC, id DESC
                 LIMIT 1"
            ),
            [],
            mileage_from_row,
        )
        .optional()?;

    Ok(record)
}

pub fn efficiency_totals(connection: &Connection) -> Result<EfficiencyTotals, DbError> {
    let totals = connection.query_row(
        "SELECT
            (SELECT MIN(odometer_reading) FROM mileage_records),
            (SELECT MAX(odometer_reading) FROM mileage_records),
            (SELECT COALESCE(SUM(total_cost), 0.0) FROM charging_sessions),
            (SELECT COALESCE(SUM(total_energy_kwh), 0.0) FROM charging_sessions),
            (SELECT COUNT(*) FROM charging_sessions)",
        [],
        |row| {
            Ok(EfficiencyTotals {
                start_mileage: row.get(0)?,
                end_mileage: row.get(1)?,
                total_cost: row.get(2)?,
                total_energy_kwh: row.get(3)?,
                total_sessions: row.get(4)?,
            })
        },
    )?;

    Ok(totals)
}

pub fn export_all(
    connection: &Connection,
) -> Result<(Vec<StoredSession>, Vec<MileageRecord>), DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM charging_sessions ORDER BY created_at ASC, id ASC"
    ))?;
    let sessions = statement
        .query_map([], session_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut statement = connection.prepare(&format!(
        "SELECT {MILEAGE_COLUMNS} FROM mileage_records ORDER BY recorded_date ASC, id ASC"
    ))?;
    let mileage = statement
        .query_map([], mileage_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((sessions, mileage))
}

// Batch entries colliding on (provider, session_id) are skipped and counted.
pub fn replace_all(
    connection: &mut Connection,
    sessions: &[ChargingSession],
    mileage: &[NewMileageRecord],
    created_at: &str,
) -> Result<ReplaceSummary, DbError> {
    let transaction = connection.transaction()?;

    transaction.execute("DELETE FROM charging_sessions", [])?;
    transaction.execute("DELETE FROM mileage_records", [])?;

    let mut summary = ReplaceSummary::default();

    for session in sessions {
        match insert_session(&transaction, session, created_at) {
            Ok(_) => summary.imported_sessions += 1,
            Err(DbError::DuplicateSession { .. }) => summary.skipped_sessions += 1,
            Err(error) => return Err(error),
        }
    }

    for record in mileage {
        insert_mileage_record(&transaction, record, created_at)?;
        summary.imported_mileage += 1;
    }

    transaction.commit()?;

    Ok(summary)
}
