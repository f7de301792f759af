mod cli;

fn main() {
    cli::setup::init_logging();
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
