use anyhow::Result;
use tracing_subscriber::EnvFilter;

use lotto_history::config;
use lotto_history::{DhLotteryClient, SyncOptions, generate_batch, open_store, synchronize};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's roll some never-drawn lottery numbers.");

    let mut store = open_store(&config.store_path)?;
    let source = DhLotteryClient::new(config.api_base.clone(), config.http_timeout())?;
    let options = SyncOptions::from_config(&config);

    let report = synchronize(store.as_mut(), &source, &options)
        .await
        .inspect_err(|e| {
            tracing::error!("synchronization failed: {:?}", e);
        })?;

    let known = &report.snapshot.combinations;
    if known.is_empty() {
        tracing::warn!("No winning history available, refusing to generate combinations.");
        return Ok(());
    }

    let batch = generate_batch(
        known,
        config.batch_size,
        config.max_attempts,
        config.batch_mode(),
        &mut rand::thread_rng(),
    );
    if batch.is_empty() {
        tracing::warn!("No combinations could be generated.");
    }

    for combination in &batch {
        println!("{}", combination);
    }

    Ok(())
}
