fn main() {
    if let Err(err) = schemagate::cli::run_cli() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
