use clap::Parser;
use encryption_tool::cli::{execute, Args};
use encryption_tool::logging;

fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init(logging::LOG_FILE) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    // Success and failure both exit 0; the outcome is reported on stdout.
    let outcome = execute(&args);
    println!("{}", outcome.message());
}
