use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_batch::output::{format_summary, format_summary_json};
use scribe_batch::transcript::WriteOptions;
use scribe_batch::{
    BatchOrchestrator, BatchRequest, Cli, Commands, Config, RateLimitedExecutor, ReportFormat,
    YtDlpFetcher,
};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the report
    let default_filter = if cli.verbose { "scribe_batch=debug" } else { "scribe_batch=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Fetch {
            identifiers,
            mode,
            output,
            timestamps,
            language,
            format,
        } => {
            let fetcher = YtDlpFetcher::new(
                config.fetch.yt_dlp_path.clone(),
                language.unwrap_or_else(|| config.fetch.language.clone()),
            );
            if !fetcher.check_availability().await {
                tracing::warn!(
                    "yt-dlp not found at {:?}; fetches will fail",
                    config.fetch.yt_dlp_path
                );
            }

            // One executor for the whole process: it remembers when the last request ran
            let executor = RateLimitedExecutor::new(config.throttle_config());
            tracing::debug!(throttle = ?executor.config(), "Rate limiter ready");

            let options = WriteOptions {
                chunk_size: config.output.chunk_size,
                include_timestamps: timestamps || config.output.include_timestamps,
            };

            let progress = if cli.quiet {
                ProgressBar::hidden()
            } else {
                let bar = ProgressBar::new(identifiers.len() as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(PROGRESS_TEMPLATE)?,
                );
                bar
            };

            let orchestrator =
                BatchOrchestrator::new(&executor, &fetcher, config.output_root()?, options)
                    .with_progress(progress);
            let request = BatchRequest {
                identifiers,
                mode,
                destination: output,
            };

            let summary = orchestrator.run(&request).await?;

            let report = match format {
                ReportFormat::Text => format_summary(&summary),
                ReportFormat::Json => format_summary_json(&summary)?,
            };
            println!("{}", report);
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save()?;
                println!("Default configuration written to: {}", path.display());
            }
            if show || !init {
                config.display();
            }
        }
    }

    Ok(())
}
