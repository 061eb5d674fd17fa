fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = ev_charge_tracker::app::run_import(&args) {
        eprintln!("receipt import failed: {err}");
        std::process::exit(1);
    }
}
