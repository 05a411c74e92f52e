fn main() {
    if let Err(e) = gcred::cli::run() {
        eprintln!("fatal: {:#}", e);
        std::process::exit(1);
    }
}
