//! Checkout simulator entry point.

use std::process::ExitCode;

use app::AppConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let config = AppConfig::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Run the simulation
    let report = match app::run(&config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "simulation failed");
            return ExitCode::FAILURE;
        }
    };

    // 4. Report
    tracing::info!(
        committed = report.committed,
        paid = report.paid,
        final_stock = report.final_stock,
        consistent = report.is_consistent(config.quantity),
        "simulation finished"
    );
    match report.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "could not serialize report"),
    }
    tracing::info!("metrics snapshot\n{}", metrics_handle.render());

    ExitCode::SUCCESS
}
