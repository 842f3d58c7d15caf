use anyhow::Result;
use clap::Parser;
use tracing::error;

use habitlens::args::{Args, Command};
use habitlens::submission::Limits;
use habitlens::{commands, utils};

fn run(args: &Args) -> Result<()> {
    let limits = Limits::from_kib(args.max_input_kib);

    match &args.command {
        Command::Summarize(cmd) => commands::run_summarize(cmd, &limits, args.workers),
        Command::Profile(cmd) => commands::run_profile(cmd, &limits, args.workers),
        Command::Analyze(cmd) => commands::run_analyze(cmd, &limits),
        Command::Export(cmd) => commands::run_export(cmd),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
