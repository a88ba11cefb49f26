use anyhow::Result;
use pv_dashboard::{
    config::AppConfig,
    metrics_server,
    observability,
    pipeline::RefreshLoop,
    sinks::DashboardSink,
    sources::PvLiveSource,
};
use pvlive_client::PvLive;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let zone = cfg.display_zone()?;

    // The dashboard slider writes the interval, the refresh loop reads it.
    let (interval_tx, interval_rx) = watch::channel(cfg.refresh.interval());

    let sink = DashboardSink::new(&cfg.display.bind_addr, &cfg.display.title, zone, interval_tx).await?;
    let source = PvLiveSource::new(PvLive::new(cfg.provider.client_config())?);

    tracing::info!(
        endpoint = %cfg.provider.base_url,
        entity_type = ?cfg.provider.entity_type,
        entity_id = cfg.provider.entity_id,
        period_minutes = cfg.provider.period_minutes,
        "starting PV generation dashboard"
    );

    RefreshLoop::new(source, sink, zone, cfg.provider.period_minutes, interval_rx)
        .run()
        .await;

    Ok(())
}
