//! Chanscout - Main Entry Point
//! Wires the Chromium adapter and result files into the job registry,
//! runs every query given on the command line and prints a summary.

mod args;
mod sink;

use anyhow::{Context, Result};
use chanscout_core::application::JobRegistry;
use chanscout_core::domain::{Job, JobId, JobState};
use chanscout_core::port::clock::SystemClock;
use chanscout_core::port::id_provider::UuidProvider;
use chanscout_core::VERSION;
use chanscout_infra_browser::ChromiumLauncher;
use clap::Parser;
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::Args;
use sink::FileResultSink;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    info!("Chanscout v{} starting...", VERSION);

    // 1. Configuration
    let config = args.crawl_config().await?;
    let queries = args.query_text().await?;

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create output dir {}", args.output_dir.display()))?;

    // 2. Wiring
    let sink = Arc::new(FileResultSink::new(
        args.output_dir.clone(),
        config.discovery_keyword.clone(),
    ));
    let launcher = Arc::new(ChromiumLauncher::new(args.launch_options()));
    let registry = JobRegistry::new(
        config,
        launcher,
        Arc::new(UuidProvider),
        Arc::new(SystemClock),
        sink.clone(),
    )
    .context("Failed to create job registry")?;

    // 3. Submit
    let ids = registry
        .submit_batch(&queries)
        .await
        .context("No search terms given (pass queries or --queries-file)")?;
    info!(jobs = ids.len(), output_dir = %sink.output_dir().display(), "Jobs submitted");

    // 4. First Ctrl+C stops every job (partial results are discarded),
    // a second one exits without waiting for browsers to close
    let watcher = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut received = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                received += 1;
                match interrupt_action(received) {
                    Interrupt::StopJobs => {
                        warn!("Shutdown signal received, stopping all jobs...");
                        let signalled = registry.cancel_all().await;
                        info!(signalled, "Stop signals sent");
                    }
                    Interrupt::ForceExit => {
                        warn!("Second shutdown signal, exiting immediately");
                        std::process::exit(130);
                    }
                }
            }
        })
    };

    registry.wait_all().await;
    watcher.abort();

    // 5. Summary
    let jobs = registry.list().await;
    let files = sink.written().await;
    print_summary(&jobs, &files);

    let completed = jobs.iter().filter(|j| j.state == JobState::Completed).count();
    info!(completed, total = jobs.len(), "Shutdown complete.");
    if completed == 0 {
        anyhow::bail!("no job completed");
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    StopJobs,
    ForceExit,
}

/// What the n-th (1-based) Ctrl+C does
fn interrupt_action(received: u32) -> Interrupt {
    if received <= 1 {
        Interrupt::StopJobs
    } else {
        Interrupt::ForceExit
    }
}

/// JSON output for production, pretty output otherwise
fn init_logging() -> Result<()> {
    let log_format = std::env::var("CHANSCOUT_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("chanscout=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Job")]
    id: String,
    #[tabled(rename = "Query")]
    query: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Channels")]
    channels: usize,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "File")]
    file: String,
}

fn summary_rows(jobs: &[Job], files: &HashMap<JobId, PathBuf>) -> Vec<SummaryRow> {
    jobs.iter()
        .map(|job| SummaryRow {
            id: job.id.clone(),
            query: job.query.clone(),
            state: job.state.to_string(),
            channels: job.result.len(),
            reason: job
                .stop_reason
                .map(|r| r.to_string())
                .or_else(|| job.error.clone())
                .unwrap_or_else(|| "-".to_string()),
            file: files
                .get(&job.id)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

fn print_summary(jobs: &[Job], files: &HashMap<JobId, PathBuf>) {
    let completed = jobs.iter().filter(|j| j.state == JobState::Completed).count();
    let headline = format!("{}/{} jobs completed", completed, jobs.len());
    if completed == jobs.len() {
        println!("{}", headline.green().bold());
    } else if completed == 0 {
        println!("{}", headline.red().bold());
    } else {
        println!("{}", headline.yellow().bold());
    }
    println!("{}", Table::new(summary_rows(jobs, files)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanscout_core::domain::{ChannelId, StopReason};

    #[test]
    fn test_summary_rows_show_file_or_error() {
        let mut done = Job::new("job-1", 0, "lofi", 2);
        done.start(1).unwrap();
        done.finish(2, StopReason::TargetReached, vec![ChannelId::new("u1"), ChannelId::new("u2")], 1)
            .unwrap();

        let mut broken = Job::new("job-2", 0, "nothing", 2);
        broken.start(1).unwrap();
        broken.fail(2, "session crashed", 1).unwrap();

        let files = HashMap::from([("job-1".to_string(), PathBuf::from("out/1_lofi.txt"))]);
        let rows = summary_rows(&[done, broken], &files);

        assert_eq!(rows[0].state, "COMPLETED");
        assert_eq!(rows[0].channels, 2);
        assert_eq!(rows[0].reason, "TARGET_REACHED");
        assert_eq!(rows[0].file, "out/1_lofi.txt");
        assert_eq!(rows[1].state, "FAILED");
        assert_eq!(rows[1].reason, "session crashed");
        assert_eq!(rows[1].file, "-");
    }

    #[test]
    fn test_second_interrupt_forces_exit() {
        assert_eq!(interrupt_action(1), Interrupt::StopJobs);
        assert_eq!(interrupt_action(2), Interrupt::ForceExit);
        assert_eq!(interrupt_action(5), Interrupt::ForceExit);
    }
}
