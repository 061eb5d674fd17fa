use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use rusqlite::Connection;

use crate::adapters::api::{ApiState, configure_routes, json_config};
use crate::adapters::db::{open_connection, run_migrations, schema_version};
use crate::app::config::AppConfig;
use crate::app::error::AppError;

pub fn open_ledger(db_path: &str) -> Result<Connection, AppError> {
    let path = std::path::Path::new(db_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(AppError::database_init)?;
    }

    let mut connection = open_connection(db_path).map_err(AppError::database_init)?;
    run_migrations(&mut connection).map_err(AppError::database_init)?;

    let version = schema_version(&connection).map_err(AppError::database_init)?;
    tracing::info!(db_path = %db_path, schema_version = version, "database ready");

    Ok(connection)
}

pub fn run_api(config: AppConfig) -> Result<(), AppError> {
    let connection = open_ledger(&config.db_path)?;
    let api_state = ApiState {
        ledger: crate::app::services::SqliteLedgerService::new(Arc::new(Mutex::new(connection))),
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let allowed_origin = config.cors_allowed_origin.clone();
    let json_limit = config.json_limit_bytes;

    actix_web::rt::System::new()
        .block_on(async move {
            HttpServer::new(move || {
                let cors = Cors::default()
                    .allowed_origin(&allowed_origin)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_header(header::CONTENT_TYPE)
                    .supports_credentials();

                App::new()
                    .wrap(cors)
                    .wrap(Logger::default())
                    .app_data(web::Data::new(api_state.clone()))
                    .app_data(json_config(json_limit))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::runtime)?;

    tracing::info!("http server stopped");
    Ok(())
}
