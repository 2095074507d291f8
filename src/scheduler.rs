use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::checker::check_profile;
use crate::config::{Config, CHECK_INTERVAL_SECS};

/// Timer trigger: runs every profile sequentially on a fixed interval with
/// dry-run disabled. Failures are logged only; there is no caller to answer.
pub struct CheckScheduler {
    cfg: Arc<Config>,
}

impl CheckScheduler {
    pub fn new(cfg: Arc<Config>) -> Self {
        Self { cfg }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(CHECK_INTERVAL_SECS));
        ticker.tick().await; // first tick fires immediately, wait a full period

        loop {
            ticker.tick().await;
            for profile_cfg in &self.cfg.profiles {
                let slug = profile_cfg.profile.slug;
                match check_profile(&self.cfg, profile_cfg, false).await {
                    Ok(result) => info!(
                        profile = slug,
                        sent = result.sent,
                        total = result.total,
                        reason = %result.reason,
                        "scheduled check complete"
                    ),
                    Err(e) => error!(profile = slug, "scheduled check failed: {e}"),
                }
            }
        }
    }
}
