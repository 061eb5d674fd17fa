fn main() {
    if let Err(err) = ev_charge_tracker::app::run_api() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}
