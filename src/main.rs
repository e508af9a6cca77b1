//! Moby CLI: staged command environments in a docker container.

use clap::Parser;
use moby::core::error::MobyError;

#[derive(Parser, Debug)]
#[command(
    name = "moby",
    version,
    about = "Run staged command environments inside a throwaway docker container"
)]
struct Cli {
    /// Debug diagnostics on stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: moby::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    moby::logging::init(cli.verbose);
    if let Err(e) = moby::cli::dispatch(cli.command) {
        // The command's own output already explains a nonzero exit.
        if !matches!(e, MobyError::AbnormalExit(_)) {
            eprintln!("error: {}", e);
        }
        std::process::exit(e.exit_code());
    }
}
