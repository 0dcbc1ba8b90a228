//! Command-line arguments with environment fallbacks

use anyhow::{Context, Result};
use chanscout_core::CrawlConfig;
use chanscout_infra_browser::LaunchOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chanscout")]
#[command(about = "Collect YouTube channel URLs by scrolling search results", long_about = None)]
#[command(version)]
pub struct Args {
    /// Search terms, one job each ("random" browses the homepage instead)
    pub queries: Vec<String>,

    /// File with one search term per line
    #[arg(short = 'f', long, env = "CHANSCOUT_QUERIES_FILE")]
    pub queries_file: Option<PathBuf>,

    /// Directory for result files
    #[arg(short, long, env = "CHANSCOUT_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Channels to collect per job
    #[arg(short, long, env = "CHANSCOUT_TARGET")]
    pub target: Option<usize>,

    /// Browsers allowed to run at the same time
    #[arg(short = 'j', long, env = "CHANSCOUT_MAX_JOBS")]
    pub max_jobs: Option<usize>,

    /// JSON file with crawl settings; flags above take precedence
    #[arg(short, long, env = "CHANSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, env = "CHANSCOUT_HEADED")]
    pub headed: bool,

    /// Chrome/Chromium binary (auto-detected by default)
    #[arg(long, env = "CHANSCOUT_CHROME")]
    pub chrome: Option<PathBuf>,
}

impl Args {
    /// Settings file (if any) overlaid with flags
    pub async fn crawl_config(&self) -> Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => CrawlConfig::default(),
        };

        if let Some(target) = self.target {
            config.target_count = target;
        }
        if let Some(max_jobs) = self.max_jobs {
            config.max_concurrent_jobs = max_jobs;
        }
        config.validate().context("Invalid crawl settings")?;
        Ok(config)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: !self.headed,
            executable: self.chrome.clone(),
            ..Default::default()
        }
    }

    /// Positional queries followed by the lines of `--queries-file`
    pub async fn query_text(&self) -> Result<String> {
        let mut text = self.queries.join("\n");
        if let Some(path) = &self.queries_file {
            let file = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read queries file {}", path.display()))?;
            text.push('\n');
            text.push_str(&file);
        }
        Ok(text)
    }
}
