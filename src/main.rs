use anyhow::Context;
use clap::Parser;
use commentary_crawler::utils::error::ErrorSeverity;
use commentary_crawler::utils::monitor::SystemMonitor;
use commentary_crawler::utils::{logger, validation::Validate};
use commentary_crawler::{ChromeSession, CliArgs, CrawlConfig, CrawlError, CrawlSummary, CsvSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting commentary crawler");

    let config = match args.load_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    tracing::debug!("Configuration: {:?}", config);

    if let Err(e) = run(&args, &config).await {
        exit_with(&e);
    }
    Ok(())
}

async fn run(args: &CliArgs, config: &CrawlConfig) -> commentary_crawler::Result<()> {
    let sink = CsvSink::new(config.output_path());
    let orchestrator = config.build_orchestrator(sink)?;
    let monitor = SystemMonitor::new(args.monitor);
    if monitor.is_enabled() {
        tracing::info!("📊 System monitoring enabled");
    }

    // Launch failure is the only fatal error of a crawl.
    let session = ChromeSession::launch(&config.browser).await?;
    let page = session.page();

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no series will be visited");
        for year in config.years() {
            match orchestrator.preview_year(page, year).await {
                Ok(decisions) => {
                    for (series, decision) in decisions {
                        let mark = if decision.include { "✅" } else { "⏭️" };
                        println!("{} {} {} ({})", year, mark, series.label(), decision.reason);
                    }
                }
                Err(e) => tracing::warn!("Skipping year {}: {}", year, e),
            }
        }
    } else {
        let mut summary = CrawlSummary::new();
        for year in config.years() {
            orchestrator.crawl_year(page, year, &mut summary).await;
            monitor.log_stats(&format!("Year {}", year));
        }
        summary.finish();
        report(&summary, config);
    }

    monitor.log_final_stats();
    session.close().await
}

fn report(summary: &CrawlSummary, config: &CrawlConfig) {
    tracing::info!(
        "✅ Crawl complete: {} years ({} skipped), {}/{} series, {}/{} matches scraped, {} lines written, {} lost",
        summary.years_visited,
        summary.years_skipped,
        summary.series_selected - summary.series_skipped,
        summary.series_seen,
        summary.matches_scraped,
        summary.matches_selected,
        summary.lines_written,
        summary.lines_lost
    );
    println!(
        "✅ Wrote {} commentary lines to {}",
        summary.lines_written,
        config.output_path()
    );
    match serde_json::to_string(summary).context("serializing crawl summary") {
        Ok(json) => tracing::debug!("Summary: {}", json),
        Err(e) => tracing::debug!("{:#}", e),
    }
}

fn exit_with(e: &CrawlError) -> ! {
    tracing::error!("❌ Crawl failed: {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
