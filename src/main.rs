mod cli;

use clap::Parser;
use colored::Colorize;
use ratchet::error::RatchetError;
use ratchet::logging::init_tracing;

use cli::{dispatch, Cli};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = dispatch(cli) {
        // Failed runs have already printed their own diagnostic
        if !matches!(e, RatchetError::MetricTestFailed | RatchetError::Interrupted) {
            eprintln!("{} {e:#}", "Error:".red().bold());
        }
        std::process::exit(e.exit_code());
    }
}
