//! ChainPulse server.
//!
//! Wires the dashboard, starts its timers and serves the REST, WebSocket and
//! SSE surface until Ctrl-C.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chainpulse::insight::TextGenerator;
use chainpulse::{transport, Dashboard, DashboardConfig};

/// ChainPulse server CLI
#[derive(Debug, Parser)]
#[command(name = "chainpulse-server")]
#[command(about = "Live supply-chain dashboard backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Listen address
    #[arg(long, env = "CHAINPULSE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Gemini API key; without it generated texts fall back to fixed messages
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model
    #[arg(long, env = "CHAINPULSE_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// Log level (used when RUST_LOG is unset)
    #[arg(long, env = "CHAINPULSE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "CHAINPULSE_LOG_JSON")]
    json: bool,

    /// Ingestion period in milliseconds
    #[arg(long)]
    ingest_ms: Option<u64>,

    /// Metrics period in milliseconds
    #[arg(long)]
    metrics_ms: Option<u64>,

    /// Inventory period in milliseconds
    #[arg(long)]
    inventory_ms: Option<u64>,

    /// Insight period in milliseconds
    #[arg(long)]
    insight_ms: Option<u64>,

    /// Delay before a decision's impact is reported, in milliseconds
    #[arg(long)]
    impact_delay_ms: Option<u64>,
}

impl Cli {
    fn config(&self) -> DashboardConfig {
        let mut cfg = DashboardConfig::default();
        let ms = |v: Option<u64>, default: Duration| v.map_or(default, Duration::from_millis);
        cfg.ingest_period = ms(self.ingest_ms, cfg.ingest_period);
        cfg.metrics_period = ms(self.metrics_ms, cfg.metrics_period);
        cfg.inventory_period = ms(self.inventory_ms, cfg.inventory_period);
        cfg.insight_period = ms(self.insight_ms, cfg.insight_period);
        cfg.impact_report_delay = ms(self.impact_delay_ms, cfg.impact_report_delay);
        cfg
    }

    #[cfg(feature = "gemini")]
    fn text_generator(&self) -> Arc<dyn TextGenerator> {
        let client = chainpulse::insight::GeminiClient::new(self.gemini_api_key.clone(), self.model.clone());
        if !client.is_configured() {
            tracing::warn!("GEMINI_API_KEY not set; insights will use fallback text");
        }
        Arc::new(client)
    }

    #[cfg(not(feature = "gemini"))]
    fn text_generator(&self) -> Arc<dyn TextGenerator> {
        tracing::warn!(model = %self.model, "built without the gemini feature; insights will use fallback text");
        Arc::new(chainpulse::insight::NoTextGenerator)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let dashboard = Arc::new(Dashboard::new(cli.config(), cli.text_generator()));
    if let Err(err) = dashboard.start() {
        tracing::error!(error = %err, "failed to start timers");
        return ExitCode::FAILURE;
    }

    let addr = SocketAddr::new(cli.host, cli.port);
    let result = transport::serve(Arc::clone(&dashboard), addr, async {
        let _ = signal::ctrl_c().await;
        tracing::info!("shutdown requested");
    })
    .await;

    dashboard.shutdown();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed");
            ExitCode::FAILURE
        }
    }
}
