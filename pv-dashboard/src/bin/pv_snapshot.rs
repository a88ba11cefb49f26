use anyhow::{bail, Result};
use pv_dashboard::{
    config::AppConfig,
    observability,
    pipeline::{day_window, Source},
    sinks::csv_out,
    sources::PvLiveSource,
    transform,
};
use pvlive_client::PvLive;
use time::OffsetDateTime;

/// Print today's generation window as CSV on stdout.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let zone = cfg.display_zone()?;
    let source = PvLiveSource::new(PvLive::new(cfg.provider.client_config())?);

    let (start, end) = day_window(OffsetDateTime::now_utc());
    let table = source.between(start, end, cfg.provider.period_minutes).await?;

    let samples = match transform::reshape(&table, &zone) {
        Ok(samples) => samples,
        Err(e) => bail!("{}: {e}", transform::NO_DATA_MESSAGE),
    };

    csv_out::write_samples(&samples, std::io::stdout().lock())?;
    tracing::info!(rows = samples.len(), %start, %end, "snapshot written");

    Ok(())
}
