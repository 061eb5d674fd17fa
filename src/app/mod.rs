mod cli;
mod config;
mod error;
mod logging;
pub mod receipt_import;
mod runtime;
pub mod services;

pub use error::AppError;

pub fn run_api() -> Result<(), AppError> {
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        cors_allowed_origin = %config.cors_allowed_origin,
        json_limit_bytes = config.json_limit_bytes,
        "application bootstrap initialized"
    );

    runtime::run_api(config)
}

pub fn run_import(args: &[String]) -> Result<(), AppError> {
    logging::init()?;

    let import_args = cli::parse_args(args)?;
    let config = config::AppConfig::from_env()?;

    cli::run(import_args, &config.db_path)
}
