use std::path::PathBuf;
use std::sync::OnceLock;

use rusqlite::Connection;

use crate::adapters::db::{open_connection, run_migrations};

const LEDGER_TEST_DIR: &str = "./target/ledger-tests";

pub fn open_test_connection(test_name: &str) -> Connection {
    let copy = tempfile::Builder::new()
        .prefix(&format!("{test_name}-"))
        .suffix(".db")
        .tempfile_in(ledger_test_dir())
        .expect("ledger copy should be created");
    let (_, path) = copy.keep().expect("ledger copy should be kept");

    std::fs::copy(migrated_ledger(), &path).expect("migrated ledger should be copied");
    open_connection(path.to_string_lossy().as_ref()).expect("ledger copy should open")
}

fn ledger_test_dir() -> &'static PathBuf {
    static DIR: OnceLock<PathBuf> = OnceLock::new();

    DIR.get_or_init(|| {
        let dir = PathBuf::from(LEDGER_TEST_DIR);
        std::fs::create_dir_all(&dir).expect("ledger test dir should be creatable");
        dir
    })
}

fn migrated_ledger() -> &'static PathBuf {
    static LEDGER: OnceLock<PathBuf> = OnceLock::new();

    LEDGER.get_or_init(|| {
        let path = ledger_test_dir().join(format!("ev_charging-{}.db", std::process::id()));
        let mut connection =
            open_connection(path.to_string_lossy().as_ref()).expect("migrated ledger opens");
        run_migrations(&mut connection).expect("ledger migrations should succeed");
        path
    })
}
