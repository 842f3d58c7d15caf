use anyhow::Result;
use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

use crate::args::{Args, Command};

/// Logs go to stderr; `--verbose` wins over `RUST_LOG`.
pub fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Worker count, defaulting to the CPU count capped at 8.
pub fn worker_count(workers: Option<usize>) -> usize {
    workers.unwrap_or_else(|| std::cmp::min(num_cpus::get(), 8))
}

pub fn validate_args(args: &Args) -> Result<()> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    if args.max_input_kib == 0 {
        anyhow::bail!("--max-input-kib must be greater than 0");
    }

    match &args.command {
        Command::Summarize(cmd) => {
            if cmd.top == Some(0) {
                anyhow::bail!("--top must be greater than 0");
            }
        }
        Command::Analyze(cmd) => {
            if cmd.timeout_secs == 0 {
                anyhow::bail!("--timeout-secs must be greater than 0");
            }
        }
        Command::Profile(_) | Command::Export(_) => {}
    }

    Ok(())
}
