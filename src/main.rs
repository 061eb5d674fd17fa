fn main() {
    if let Err(err) = ev_charge_tracker::app::run_api() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
