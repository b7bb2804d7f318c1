use recwell_sync::startup;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting RecWell badminton sync");

    // Load configuration
    let config = startup::load_config()?;

    let summary = startup::run(config).await?;
    match summary.report {
        Some(report) => println!(
            "Synced {} events for {} to {}: {} inserted, {} updated, {} deleted",
            summary.synthesized(),
            summary.window.start_date(),
            summary.window.end_date(),
            report.inserted,
            report.updated,
            report.deleted
        ),
        None => println!("Dry run: {} events, calendar untouched", summary.synthesized()),
    }

    Ok(())
}
