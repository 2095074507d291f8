//! Change-detection and delivery core. One run is strictly sequential:
//! init-flag probe, fetch, diff against the durable seen-set, then the
//! notify loop. A lot id is committed to the seen-set only after its alert
//! was acknowledged, so a failed delivery stays eligible for the next run.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{Config, ProfileConfig, NOTIFY_PACING_MS};
use crate::error::Result;
use crate::notifier::{format_listing_message, Notify, TelegramNotifier};
use crate::profile::FilterProfile;
use crate::source::{ListingSource, SourceClient};
use crate::store::{RedisRestStore, SeenSetStore};
use crate::types::{CheckReason, CheckResult, Listing};

/// Runs one check for one profile: bootstrap when the init flag is absent,
/// incremental otherwise. Fetch and store errors propagate to the trigger;
/// delivery failures only skip the seen-set commit for that item.
pub async fn run_check<L, S, N>(
    source: &L,
    store: &S,
    notifier: &N,
    profile: &FilterProfile,
    dry_run: bool,
) -> Result<CheckResult>
where
    L: ListingSource,
    S: SeenSetStore,
    N: Notify,
{
    let seen_key = profile.seen_key();
    let init_key = profile.init_key();

    if !store.exists(&init_key).await? {
        // First run establishes the baseline silently, no notifications.
        info!(profile = profile.slug, "first run: initializing seen-set baseline");
        let listings = source.fetch_listings(profile).await?;
        let lots = collect_lot_ids(&listings);
        if !lots.is_empty() {
            store.add(&seen_key, &lots).await?;
        }
        store.set_scalar(&init_key, "1").await?;
        return Ok(CheckResult {
            sent: 0,
            reason: CheckReason::Bootstrap,
            total: listings.len(),
            new_count: None,
        });
    }

    let listings = source.fetch_listings(profile).await?;
    info!(profile = profile.slug, total = listings.len(), "fetched listings");

    let seen = store.members(&seen_key).await?;
    let delta = compute_delta(&listings, &seen);

    if delta.is_empty() {
        return Ok(CheckResult {
            sent: 0,
            reason: CheckReason::NoNewListings,
            total: listings.len(),
            new_count: None,
        });
    }
    info!(profile = profile.slug, new = delta.len(), "found new listings");

    if dry_run {
        return Ok(CheckResult {
            sent: 0,
            reason: CheckReason::DryRun,
            total: listings.len(),
            new_count: Some(delta.len()),
        });
    }

    let mut sent = 0;
    for listing in &delta {
        let message = format_listing_message(profile.message_prefix, listing);
        if notifier.deliver(&message).await {
            store
                .add(&seen_key, std::slice::from_ref(&listing.lot))
                .await?;
            sent += 1;
            tokio::time::sleep(Duration::from_millis(NOTIFY_PACING_MS)).await;
        } else {
            warn!(
                profile = profile.slug,
                lot = %listing.lot,
                "delivery failed, lot stays unseen for the next run"
            );
        }
    }

    Ok(CheckResult {
        sent,
        reason: CheckReason::NewListings,
        total: listings.len(),
        new_count: Some(delta.len()),
    })
}

/// Convenience wrapper for the triggers: builds the per-run clients from
/// configuration and runs one check.
pub async fn check_profile(
    cfg: &Config,
    profile_cfg: &ProfileConfig,
    dry_run: bool,
) -> Result<CheckResult> {
    let source = SourceClient::new(&cfg.base_url);
    let store = RedisRestStore::new(&cfg.store_url, &cfg.store_token)?;
    let notifier = TelegramNotifier::new(
        &profile_cfg.telegram_bot_token,
        &profile_cfg.telegram_chat_id,
    )?;
    run_check(&source, &store, &notifier, &profile_cfg.profile, dry_run).await
}

/// Unique non-empty lot ids of a snapshot, first occurrence order preserved.
fn collect_lot_ids(listings: &[Listing]) -> Vec<String> {
    let mut unique = HashSet::new();
    listings
        .iter()
        .filter(|l| !l.lot.is_empty() && unique.insert(l.lot.clone()))
        .map(|l| l.lot.clone())
        .collect()
}

/// Listings whose lot id is non-empty and not yet seen, in snapshot order.
/// Attribute changes on an already-seen lot are not a "new" event.
fn compute_delta<'a>(listings: &'a [Listing], seen: &HashSet<String>) -> Vec<&'a Listing> {
    listings
        .iter()
        .filter(|l| !l.lot.is_empty() && !seen.contains(&l.lot))
        .collect()
}
