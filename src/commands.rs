use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::aggregate::{aggregate, Aggregation};
use crate::args::{AnalyzeArgs, ExportArgs, ProfileArgs, SummarizeArgs};
use crate::classify::{classify, Profile};
use crate::domain::redact_domain;
use crate::narrative::GeminiClient;
use crate::sqlite;
use crate::stats::{SkippedLine, SummaryRow};
use crate::submission::{self, Limits, Submission};
use crate::utils::{format_number, worker_count};

pub struct FileSummary {
    pub path: PathBuf,
    pub aggregation: Aggregation,
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    file: String,
    rows: Vec<SummaryRow>,
    skipped: &'a [SkippedLine],
}

/// Reads `path` and checks it against `limits`.
pub fn load_submission(path: &Path, limits: &Limits) -> Result<Submission> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let submission = Submission::new(content, filename);
    submission
        .validate(limits)
        .with_context(|| format!("Rejected {:?}", path))?;
    Ok(submission)
}

fn thread_pool(workers: Option<usize>) -> Result<rayon::ThreadPool> {
    let workers = worker_count(workers);
    info!(action = "configure", component = "batch", worker_count = workers, "Using workers for processing");
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")
}

/// Aggregates every file independently, in parallel. Results keep the order
/// of `files`.
pub fn summarize_files(
    files: &[PathBuf],
    limits: &Limits,
    workers: Option<usize>,
) -> Result<Vec<Result<FileSummary>>> {
    let start_time = Instant::now();
    let pool = thread_pool(workers)?;

    let results: Vec<Result<FileSummary>> = pool.install(|| {
        files
            .par_iter()
            .map(|path| -> Result<FileSummary> {
                let submission = load_submission(path, limits)?;
                let aggregation = aggregate(&submission.content)
                    .with_context(|| format!("Failed to summarize {:?}", path))?;
                Ok(FileSummary {
                    path: path.clone(),
                    aggregation,
                })
            })
            .collect()
    });

    info!(
        action = "complete",
        component = "batch",
        file_count = files.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Batch summarized"
    );
    Ok(results)
}

fn summary_file_name(path: &Path, json: bool) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "history".to_string());
    let extension = if json { "json" } else { "csv" };
    PathBuf::from(format!("{stem}.summary.{extension}"))
}

fn render_summary(summary: &FileSummary, json: bool) -> Result<String> {
    if !json {
        return Ok(summary.aggregation.summary.to_csv()?);
    }

    let rows: Vec<SummaryRow> = summary
        .aggregation
        .summary
        .table()
        .map(|table| table.rows().collect())
        .unwrap_or_default();
    let report = SummaryReport {
        file: summary.path.display().to_string(),
        rows,
        skipped: &summary.aggregation.skipped,
    };
    Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
}

/// Writes the rendered summary into `output` when given, else to stdout.
/// Returns the file written, if any.
fn emit_summary(
    summary: &FileSummary,
    json: bool,
    output: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let rendered = render_summary(summary, json)?;
    let Some(dir) = output else {
        print!("{}", rendered);
        return Ok(None);
    };

    let target = dir.join(summary_file_name(&summary.path, json));
    fs::write(&target, rendered).with_context(|| format!("Failed to write {:?}", target))?;
    info!(action = "write", component = "summary", path = ?target, "Summary written");
    Ok(Some(target))
}

/// Fails the command if any file failed.
fn report_failures(failed: usize, total: usize) -> Result<()> {
    if failed > 0 {
        anyhow::bail!("{} of {} files could not be processed", failed, total);
    }
    Ok(())
}

pub fn run_summarize(cmd: &SummarizeArgs, limits: &Limits, workers: Option<usize>) -> Result<()> {
    let results = summarize_files(&cmd.files, limits, workers)?;
    let total = results.len();
    let mut failed = 0;

    if let Some(dir) = &cmd.output {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    for result in results {
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                error!("{:#}", e);
                failed += 1;
                continue;
            }
        };

        emit_summary(&summary, cmd.json, cmd.output.as_deref())?;

        if let Some(top) = cmd.top {
            print_top_domains(&summary, top, cmd.redact);
        }
    }

    report_failures(failed, total)
}

fn print_top_domains(summary: &FileSummary, top: usize, redact: bool) {
    let Some(table) = summary.aggregation.summary.table() else {
        eprintln!("\n--- {} ---\nNo visits found", summary.path.display());
        return;
    };
    let totals = table.domain_totals();

    eprintln!("\n--- {} ---", summary.path.display());
    if let Some((earliest, latest)) = table.date_range() {
        let days = (latest - earliest).num_days();
        eprintln!(
            "Date range: {} to {} ({} days)",
            earliest.format("%B %-d, %Y"),
            latest.format("%B %-d, %Y"),
            format_number(days.unsigned_abs())
        );
    }
    eprintln!("Unique domains: {}", format_number(totals.len() as u64));
    eprintln!(
        "Lines skipped: {}",
        format_number(summary.aggregation.skipped.len() as u64)
    );

    eprintln!("\nTop {} most visited domains:", top.min(totals.len()));
    for (domain, count) in totals.iter().take(top) {
        let display_domain = if redact {
            redact_domain(domain.as_str())
        } else {
            domain.to_string()
        };
        eprintln!("- {}: {} visits", display_domain, format_number(*count));
    }
}

#[derive(Serialize)]
struct ProfileReport {
    file: String,
    profile: Option<Profile>,
}

/// Profiles each file. Raw exports are summarized first; files that already
/// hold a summary are scored as they are.
pub fn run_profile(cmd: &ProfileArgs, limits: &Limits, workers: Option<usize>) -> Result<()> {
    let pool = thread_pool(workers)?;
    let results: Vec<Result<ProfileReport>> = pool.install(|| {
        cmd.files
            .par_iter()
            .map(|path| -> Result<ProfileReport> {
                let submission = load_submission(path, limits)?;
                let profile = profile_text(&submission.content)
                    .with_context(|| format!("Failed to profile {:?}", path))?;
                Ok(ProfileReport {
                    file: path.display().to_string(),
                    profile,
                })
            })
            .collect()
    });

    let total = results.len();
    let mut failed = 0;
    for result in results {
        match result {
            Ok(report) if cmd.json => println!("{}", serde_json::to_string_pretty(&report)?),
            Ok(report) => print_profile(&report.file, report.profile.as_ref()),
            Err(e) => {
                error!("{:#}", e);
                failed += 1;
            }
        }
    }

    report_failures(failed, total)
}

fn profile_text(content: &str) -> Result<Option<Profile>> {
    let is_summary = content
        .lines()
        .next()
        .is_some_and(|header| header.trim() == "URL,Date,Visit Count");
    if is_summary {
        return Ok(classify(content));
    }
    let csv = aggregate(content)?.summary.to_csv()?;
    Ok(classify(&csv))
}

fn print_profile(file: &str, profile: Option<&Profile>) {
    println!("\n--- {} behavioral profile (DISC) ---", file);
    let Some(profile) = profile else {
        println!("No profile keywords were found in this history.");
        return;
    };
    for score in profile.ranked() {
        println!("{:>6.1}%  {}", score.percentage, score.axis.label());
        println!("         {}", score.axis.interpretation());
    }
}

pub fn run_analyze(cmd: &AnalyzeArgs, limits: &Limits) -> Result<()> {
    let api_key = cmd
        .api_key
        .clone()
        .context("A Google API key must be provided via --api-key or GOOGLE_API_KEY")?;
    let client = GeminiClient::with_timeout(
        api_key,
        cmd.model.clone(),
        Duration::from_secs(cmd.timeout_secs),
    )?;

    let submission = load_submission(&cmd.file, limits)?;
    let analysis = submission::analyze(&submission, &client, limits)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    print_profile(&analysis.filename, analysis.profile.as_ref());
    println!();
    match &analysis.analysis {
        Some(text) => println!("{}", text),
        None => println!("No visits could be summarized from {}.", analysis.filename),
    }
    Ok(())
}

pub fn run_export(cmd: &ExportArgs) -> Result<()> {
    let csv = sqlite::export_browser_history(
        &cmd.browser,
        cmd.history.as_deref(),
        cmd.temp_path.as_deref(),
    )?;

    match &cmd.output {
        Some(path) => {
            fs::write(path, csv).with_context(|| format!("Failed to write {:?}", path))?;
            info!(action = "write", component = "history_export", path = ?path, "Export written");
        }
        None => print!("{}", csv),
    }
    Ok(())
}
