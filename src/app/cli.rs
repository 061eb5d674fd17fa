use std::io::Read;
use std::sync::{Arc, Mutex};

use crate::app::AppError;
use crate::app::receipt_import::{import_receipt, preview_receipt};
use crate::app::runtime::open_ledger;
use crate::app::services::SqliteLedgerService;
use crate::domain::receipt_parser::Provider;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportArgs {
    pub file: Option<String>,
    pub provider: Option<Provider>,
    pub db_path: Option<String>,
    pub dry_run: bool,
    pub help: bool,
}

pub fn parse_args(args: &[String]) -> Result<ImportArgs, AppError> {
    let mut parsed = ImportArgs::default();
    let mut index = 0;

    while index < args.len() {
        match args[index].as_str() {
            "--file" => {
                parsed.file = Some(option_value(args, index, "--file")?);
                index += 2;
            }
            "--provider" => {
                let name = option_value(args, index, "--provider")?;
                parsed.provider = Some(
                    name.parse::<Provider>()
                        .map_err(|_| AppError::usage(format!("unknown provider: {name}")))?,
                );
                index += 2;
            }
            "--db" => {
                parsed.db_path = Some(option_value(args, index, "--db")?);
                index += 2;
            }
            "--dry-run" => {
                parsed.dry_run = true;
                index += 1;
            }
            "--help" | "-h" => {
                parsed.help = true;
                index += 1;
            }
            other => {
                return Err(AppError::usage(format!("unknown argument: {other}")));
            }
        }
    }

    Ok(parsed)
}

fn option_value(args: &[String], index: usize, flag: &str) -> Result<String, AppError> {
    args.get(index + 1)
        .cloned()
        .ok_or_else(|| AppError::usage(format!("{flag} requires a value")))
}

pub fn run(args: ImportArgs, default_db_path: &str) -> Result<(), AppError> {
    if args.help {
        print_help();
        return Ok(());
    }

    let receipt = read_receipt(args.file.as_deref())?;

    if args.dry_run {
        let session = preview_receipt(&receipt, args.provider)?;
        print_json(&session)?;
        return Ok(());
    }

    let db_path = args.db_path.as_deref().unwrap_or(default_db_path);
    let connection = open_ledger(db_path)?;
    let ledger = SqliteLedgerService::new(Arc::new(Mutex::new(connection)));

    let imported = import_receipt(&ledger, &receipt, args.provider)?;
    print_json(&imported)
}

fn read_receipt(file: Option<&str>) -> Result<String, AppError> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|error| AppError::usage(format!("failed to read {path}: {error}"))),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|error| AppError::usage(format!("failed to read stdin: {error}")))?;
            Ok(buffer)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(AppError::runtime)?;
    println!("{rendered}");
    Ok(())
}

fn print_help() {
    println!("tracker_import");
    println!();
    println!("Usage:");
    println!("  tracker_import [--file <receipt.txt>] [--provider <name>] [--db <file>] [--dry-run]");
    println!();
    println!("Options:");
    println!("  --file <path>      receipt text to import (default: read stdin)");
    println!("  --provider <name>  skip vendor detection, e.g. AmpUp");
    println!("  --db <file>        sqlite file (default: DB_PATH)");
    println!("  --dry-run          parse and print the session without storing it");
}

#[cfg(test)]
mod tests {
    use super::{ImportArgs, parse_args, run};
    use crate::domain::receipt_parser::Provider;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_all_options() {
        let parsed = parse_args(&args(&[
            "--file",
            "receipt.txt",
            "--provider",
            "ampup",
            "--db",
            "ledger.db",
            "--dry-run",
        ]))
        .expect("args should parse");

        assert_eq!(
            parsed,
            ImportArgs {
                file: Some("receipt.txt".to_string()),
                provider: Some(Provider::AmpUp),
                db_path: Some("ledger.db".to_string()),
                dry_run: true,
                help: false,
            }
        );
    }

    #[test]
    fn rejects_missing_values_and_unknown_flags() {
        assert_eq!(
            parse_args(&args(&["--file"]))
                .expect_err("missing value should fail")
                .to_string(),
            "invalid arguments: --file requires a value"
        );
        assert_eq!(
            parse_args(&args(&["--verbose"]))
                .expect_err("unknown flag should fail")
                .to_string(),
            "invalid arguments: unknown argument: --verbose"
        );
        assert_eq!(
            parse_args(&args(&["--provider", "tesla"]))
                .expect_err("unknown provider should fail")
                .to_string(),
            "invalid arguments: unknown provider: tesla"
        );
    }

    #[test]
    fn imports_receipt_file_into_database() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let receipt_path = dir.path().join("receipt.txt");
        let db_path = dir.path().join("ledger.sqlite");
        std::fs::write(
            &receipt_path,
            "AmpUp\nEVSE ID: E1\nTotal Price: $2.00\nSession ID: CLI-1\n",
        )
        .expect("receipt should be written");

        let import_args = ImportArgs {
            file: Some(receipt_path.to_string_lossy().to_string()),
            db_path: Some(db_path.to_string_lossy().to_string()),
            ..ImportArgs::default()
        };

        run(import_args.clone(), "unused.db").expect("first import should succeed");
        let second = run(import_args, "unused.db");

        assert_eq!(
            second.expect_err("duplicate should fail").to_string(),
            "charging session CLI-1 from AmpUp has already been recorded"
        );
    }
}
