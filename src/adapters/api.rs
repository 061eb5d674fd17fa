use actix_web::{HttpResponse, Responder, delete, error::InternalError, get, post, put, web};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::db::DbError;
use crate::app::receipt_import::{import_receipt, preview_receipt};
use crate::app::services::{
    MileageCommandHandler, MileageQueryHandler, ServiceError, SessionCommandHandler,
    SessionQueryHandler, SqliteLedgerService, timestamp_now,
};
use crate::domain::models::{ChargingSession, NewMileageRecord};
use crate::domain::receipt_parser::{Provider, ReceiptError};

#[derive(Clone)]
pub struct ApiState {
    pub ledger: SqliteLedgerService,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub total_cost: Option<f64>,
    #[serde(flatten)]
    pub session: ChargingSession,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub text: String,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub sessions: Option<Vec<ChargingSession>>,
    #[serde(rename = "mileageRecords", default)]
    pub mileage_records: Option<Vec<NewMileageRecord>>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(session_stats_endpoint)
        .service(list_sessions_endpoint)
        .service(find_session_endpoint)
        .service(create_session_endpoint)
        .service(delete_session_endpoint)
        .service(parse_receipt_endpoint)
        .service(import_receipt_endpoint)
        .service(list_mileage_endpoint)
        .service(latest_mileage_endpoint)
        .service(create_mileage_endpoint)
        .service(update_mileage_endpoint)
        .service(delete_mileage_endpoint)
        .service(efficiency_metrics_endpoint)
        .service(export_endpoint)
        .service(import_endpoint)
        .default_service(web::to(not_found));
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|error, _request| {
            let response = HttpResponse::BadRequest().json(json!({ "error": error.to_string() }));
            InternalError::from_response(error, response).into()
        })
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Endpoint not found" }))
}

#[get("/api/health")]
async fn health(state: web::Data<ApiState>) -> impl Responder {
    let status = state
        .ledger
        .get_schema_version()
        .and_then(|version| Ok((version, state.ledger.count_sessions()?)));

    match status {
        Ok((schema_version, sessions_count)) => HttpResponse::Ok().json(json!({
            "status": "OK",
            "timestamp": timestamp_now(),
            "database": "Connected",
            "schemaVersion": schema_version,
            "sessionsCount": sessions_count,
        })),
        Err(error) => {
            tracing::warn!(error = %error, "health check could not reach the database");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "ERROR",
                "timestamp": timestamp_now(),
                "database": "Unavailable",
            }))
        }
    }
}

#[get("/api/sessions")]
async fn list_sessions_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.list_sessions() {
        Ok(sessions) => HttpResponse::Ok().json(sessions),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/sessions/stats")]
async fn session_stats_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.session_stats() {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/sessions/{provider}/{session_id}")]
async fn find_session_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (provider, session_id) = path.into_inner();

    match state.ledger.find_session(&provider, &session_id) {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/sessions")]
async fn create_session_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<CreateSessionRequest>,
) -> impl Responder {
    let CreateSessionRequest {
        total_cost,
        mut session,
    } = body.into_inner();

    let Some(total_cost) = total_cost else {
        return missing_session_fields();
    };
    if session.provider.trim().is_empty() || session.session_id.trim().is_empty() {
        return missing_session_fields();
    }
    session.total_cost = total_cost;

    match state.ledger.insert_session(&session) {
        Ok(id) => HttpResponse::Created().json(json!({
            "id": id,
            "message": "Session created successfully",
        })),
        Err(error) => service_error_response(error),
    }
}

fn missing_session_fields() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "error": "Missing required fields: provider, session_id, and total_cost are required"
    }))
}

#[delete("/api/sessions/{id}")]
async fn delete_session_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    match state.ledger.delete_session(path.into_inner()) {
        Ok(true) => HttpResponse::Ok().json(json!({ "message": "Session deleted successfully" })),
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "Session not found" })),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/receipts/parse")]
async fn parse_receipt_endpoint(body: web::Json<ReceiptRequest>) -> impl Responder {
    let provider = match requested_provider(&body) {
        Ok(provider) => provider,
        Err(error) => return service_error_response(error.into()),
    };

    match preview_receipt(&body.text, provider) {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/receipts")]
async fn import_receipt_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<ReceiptRequest>,
) -> impl Responder {
    let provider = match requested_provider(&body) {
        Ok(provider) => provider,
        Err(error) => return service_error_response(error.into()),
    };

    match import_receipt(&state.ledger, &body.text, provider) {
        Ok(imported) => HttpResponse::Created().json(imported),
        Err(error) => service_error_response(error),
    }
}

fn requested_provider(body: &ReceiptRequest) -> Result<Option<Provider>, ReceiptError> {
    body.provider
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse::<Provider>)
        .transpose()
}

#[get("/api/mileage")]
async fn list_mileage_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.list_mileage_records() {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/mileage/latest")]
async fn latest_mileage_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.get_latest_mileage() {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/mileage")]
async fn create_mileage_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<NewMileageRecord>,
) -> impl Responder {
    match state.ledger.add_mileage_record(&body) {
        Ok(id) => HttpResponse::Created().json(json!({
            "id": id,
            "message": "Mileage record created successfully",
        })),
        Err(error) => service_error_response(error),
    }
}

#[put("/api/mileage/{id}")]
async fn update_mileage_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    body: web::Json<NewMileageRecord>,
) -> impl Responder {
    match state.ledger.update_mileage_record(path.into_inner(), &body) {
        Ok(true) => {
            HttpResponse::Ok().json(json!({ "message": "Mileage record updated successfully" }))
        }
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "Mileage record not found" })),
        Err(error) => service_error_response(error),
    }
}

#[delete("/api/mileage/{id}")]
async fn delete_mileage_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    match state.ledger.delete_mileage_record(path.into_inner()) {
        Ok(true) => {
            HttpResponse::Ok().json(json!({ "message": "Mileage record deleted successfully" }))
        }
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "Mileage record not found" })),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/metrics/efficiency")]
async fn efficiency_metrics_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.efficiency_metrics() {
        Ok(metrics) => HttpResponse::Ok().json(metrics),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/export")]
async fn export_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.ledger.export_data() {
        Ok(export) => HttpResponse::Ok().json(export),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/import")]
async fn import_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<ImportRequest>,
) -> impl Responder {
    let ImportRequest {
        sessions,
        mileage_records,
    } = body.into_inner();

    let Some(sessions) = sessions else {
        return HttpResponse::BadRequest().json(json!({ "error": "Sessions must be an array" }));
    };
    let mileage_records = mileage_records.unwrap_or_default();

    match state.ledger.replace_all(&sessions, &mileage_records) {
        Ok(summary) if summary.skipped_sessions > 0 => {
            tracing::warn!(
                skipped_sessions = summary.skipped_sessions,
                "import skipped duplicate sessions"
            );
            HttpResponse::MultiStatus().json(json!({
                "message": "Import completed with errors",
                "importedSessions": summary.imported_sessions,
                "importedMileage": summary.imported_mileage,
                "errors": summary.skipped_sessions,
            }))
        }
        Ok(summary) => HttpResponse::Ok().json(json!({
            "message": "Data imported successfully",
            "importedSessions": summary.imported_sessions,
            "importedMileage": summary.imported_mileage,
        })),
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    let message = error.to_string();
    match error {
        ServiceError::DbLockPoisoned => HttpResponse::InternalServerError().json(json!({
            "error": "database lock poisoned"
        })),
        ServiceError::DuplicateSession { .. }
        | ServiceError::Database(DbError::DuplicateSession { .. }) => {
            HttpResponse::Conflict().json(json!({ "error": message }))
        }
        ServiceError::Database(error) => {
            tracing::error!(error = %error, "database operation failed");
            HttpResponse::InternalServerError().json(json!({
                "error": format!("database query failed: {error}")
            }))
        }
        ServiceError::Receipt(_) => {
            HttpResponse::UnprocessableEntity().json(json!({ "error": message }))
        }
        ServiceError::Validation(_)
        | ServiceError::EmptyReceipt
        | ServiceError::InvalidOdometer(_)
        | ServiceError::OdometerRegression { .. }
        | ServiceError::InvalidRecordedDate(_) => {
            HttpResponse::BadRequest().json(json!({ "error": message }))
        }
    }
}
