//! ipscope - Public IP address and geolocation lookup
//!
//! Prints your public IPv4/IPv6 address (or a target address) together with
//! country, city, coordinates, ISP and ASN, caching results for a day.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use ipscope::cli::{render_outcome, render_preamble, Cli};
use ipscope::pipeline::{LookupError, LookupOutcome, LookupPipeline};

/// Installs the stderr log subscriber
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<LookupOutcome, LookupError> {
    let pipeline = LookupPipeline::from_config(&cli.lookup_config())?;
    pipeline.run(&cli.query()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !cli.json {
        print!("{}", render_preamble(&cli));
    }

    let outcome = match run(&cli).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&outcome.result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to encode result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", render_outcome(&cli.query(), &outcome));
    }

    ExitCode::SUCCESS
}
