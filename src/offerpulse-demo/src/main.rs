//! OfferPulse demo — mounts a survey widget against a tracking endpoint,
//! simulates a short click session, and prints the queue status.

use clap::Parser;
use offerpulse_core::config::SdkConfig;
use offerpulse_widget_sdk::{
    FileStorage, HttpBeaconTransport, HttpDeliveryClient, NetworkMonitor, SurveyWidget,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "offerpulse-demo")]
#[command(about = "Simulate a survey widget session against a tracking endpoint")]
#[command(version)]
struct Cli {
    /// Tracking endpoint base URL (overrides config)
    #[arg(long, env = "OFFERPULSE__ENDPOINT")]
    endpoint: Option<String>,

    /// Survey identifier to report against
    #[arg(long, default_value = "demo-survey")]
    survey_id: String,

    /// Number of clicks to simulate
    #[arg(long, default_value_t = 5)]
    clicks: u32,

    /// Directory for the pending-event store
    #[arg(long, default_value = ".offerpulse")]
    storage_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offerpulse=info,offerpulse_widget_sdk=debug".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = SdkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        SdkConfig::default()
    });
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    info!(
        endpoint = %config.endpoint,
        survey_id = %cli.survey_id,
        clicks = cli.clicks,
        "OfferPulse demo starting up"
    );

    let delivery = HttpDeliveryClient::new(config.endpoint.clone()).into_client();
    let transport = Arc::new(HttpBeaconTransport::new(config.endpoint.clone()));
    let backend = Arc::new(FileStorage::new(&cli.storage_dir)?);
    let network = Arc::new(NetworkMonitor::new(true));

    let widget = SurveyWidget::mount(
        &config,
        cli.survey_id.clone(),
        delivery,
        transport,
        backend,
        network,
    );

    for i in 0..cli.clicks {
        widget.track_click(
            "demo-session",
            &format!("question-{}", i % 3),
            &format!("offer-{}", i % 2),
            "variant-a",
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    widget.flush().await;

    if let Some(status) = widget.status() {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    widget.send_dwell_event();
    widget.unmount();
    // Give the final beacon POST a moment before the runtime shuts down.
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!("demo session complete");
    Ok(())
}
