use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::checker::check_profile;
use crate::config::Config;
use crate::error::AppError;
use crate::types::CheckResult;

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/check", get(check_endpoint).post(check_endpoint))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct CheckQuery {
    #[serde(rename = "dryRun")]
    pub dry_run: Option<bool>,
    /// Profile slug; omitted means every profile runs sequentially.
    pub profile: Option<String>,
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "bidcars-watcher" }))
}

/// On-demand trigger. Errors surface as `{ok: false, error}` with a
/// non-success status via the `AppError` response mapping.
async fn check_endpoint(
    State(state): State<ApiState>,
    Query(params): Query<CheckQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dry_run = params.dry_run.unwrap_or(false);

    if let Some(slug) = params.profile {
        let profile_cfg = state
            .cfg
            .profiles
            .iter()
            .find(|pc| pc.profile.slug == slug)
            .ok_or_else(|| AppError::UnknownProfile(slug.clone()))?;
        let result = run_logged(&state.cfg, profile_cfg, dry_run).await?;
        let mut body = serde_json::to_value(&result).unwrap_or_default();
        if let Some(obj) = body.as_object_mut() {
            obj.insert("ok".to_string(), json!(true));
        }
        return Ok(Json(body));
    }

    let mut results = Vec::new();
    for profile_cfg in &state.cfg.profiles {
        let result = run_logged(&state.cfg, profile_cfg, dry_run).await?;
        let mut entry = serde_json::to_value(&result).unwrap_or_default();
        if let Some(obj) = entry.as_object_mut() {
            obj.insert("profile".to_string(), json!(profile_cfg.profile.slug));
        }
        results.push(entry);
    }
    Ok(Json(json!({ "ok": true, "results": results })))
}

async fn run_logged(
    cfg: &Config,
    profile_cfg: &crate::config::ProfileConfig,
    dry_run: bool,
) -> Result<CheckResult, AppError> {
    check_profile(cfg, profile_cfg, dry_run).await.map_err(|e| {
        error!(profile = profile_cfg.profile.slug, "check failed: {e}");
        e
    })
}
