use crate::api::DrawSource;
use crate::config::Config;
use crate::database::CombinationStore;
use crate::types::StoreSnapshot;
use anyhow::Result;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROGRESS_EVERY: usize = 20;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Draws to bootstrap when the store has no cursor yet.
    pub fallback_window_draws: u32,
    /// Latest draw assumed when the source cannot tell us.
    pub fallback_latest: u32,
    /// Pause between two consecutive draw fetches.
    pub fetch_delay: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fallback_window_draws: config.fallback_window_draws(),
            fallback_latest: config.fallback_draw,
            fetch_delay: config.fetch_delay(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub snapshot: StoreSnapshot,
    pub latest_index: u32,
    pub used_fallback: bool,
    pub fetched: usize,
    pub newly_added: usize,
    pub skipped: usize,
}

/// Draws that still need fetching, or `None` when the store is current.
///
/// A zero cursor means cold start: only the most recent
/// `fallback_window_draws` draws are pulled instead of the whole archive.
pub fn fetch_window(
    last_synced_index: u32,
    current_max: u32,
    fallback_window_draws: u32,
) -> Option<RangeInclusive<u32>> {
    let start = if last_synced_index == 0 {
        current_max.saturating_sub(fallback_window_draws).max(1)
    } else {
        last_synced_index.checked_add(1)?
    };

    (start <= current_max).then_some(start..=current_max)
}

/// Brings the store up to the latest draw and returns the merged snapshot.
///
/// Draws are fetched newest first, one at a time. A draw that fails to fetch
/// is skipped and the cursor still advances past it, so it is only recovered
/// by a later cold-start rebuild.
pub async fn synchronize<S, D>(
    store: &mut S,
    source: &D,
    options: &SyncOptions,
) -> Result<SyncReport>
where
    S: CombinationStore + ?Sized,
    D: DrawSource,
{
    let StoreSnapshot {
        last_synced_index,
        mut combinations,
    } = store.load();

    let (current_max, used_fallback) = match source.latest_index().await {
        Ok(latest) => (latest, false),
        Err(e) => {
            warn!(
                "⚠ could not determine the latest draw ({:#}), assuming draw {}; \
                 the update may be incomplete",
                e, options.fallback_latest
            );
            (options.fallback_latest, true)
        }
    };

    let window = fetch_window(last_synced_index, current_max, options.fallback_window_draws);
    match &window {
        None => info!("🎯 Already up to date at draw {}", last_synced_index),
        Some(range) if last_synced_index == 0 => info!(
            "No usable history, bootstrapping draws {} to {}",
            range.start(),
            range.end()
        ),
        Some(range) => info!("📥 Fetching new draws {} to {}", range.start(), range.end()),
    }

    let mut fetched = 0;
    let mut newly_added = 0;
    let mut skipped = 0;

    if let Some(range) = window {
        let mut first = true;
        for draw_no in range.rev() {
            if draw_no <= last_synced_index {
                break;
            }

            if !first {
                tokio::time::sleep(options.fetch_delay).await;
            }
            first = false;

            match source.fetch_draw(draw_no).await {
                Ok(Some(record)) => {
                    fetched += 1;
                    debug!(
                        "✓ draw {} ({}): {}",
                        record.draw_no,
                        record
                            .draw_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "unknown date".to_string()),
                        record.combination
                    );
                    if combinations.insert(record.combination) {
                        newly_added += 1;
                        if newly_added % PROGRESS_EVERY == 0 {
                            info!("  {} new combinations collected so far...", newly_added);
                        }
                    }
                }
                Ok(None) => {
                    skipped += 1;
                    debug!("no result for draw {}, skipping", draw_no);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("✗ failed to fetch draw {}: {:#}", draw_no, e);
                }
            }
        }
    }

    info!(
        "Added {} new combinations, {} unique combinations known",
        newly_added,
        combinations.len()
    );

    let snapshot = StoreSnapshot::new(last_synced_index.max(current_max), combinations);
    store.save(&snapshot)?;

    Ok(SyncReport {
        snapshot,
        latest_index: current_max,
        used_fallback,
        fetched,
        newly_added,
        skipped,
    })
}
