//! Listing source client. The search endpoint sits behind bot detection, so a
//! plain HTTP request comes back challenged. Instead we drive a headless
//! Chrome session: navigate to the rendered search page, let the challenge
//! script settle, then issue the JSON request from inside the page so the
//! clearance cookies apply. Slow (seconds to tens of seconds), one attempt
//! per run; a failure propagates directly to the caller.

use std::future::Future;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{CHALLENGE_SETTLE_MS, SEARCH_PAGE_SIZE, SOURCE_FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::{AppError, Result};
use crate::profile::FilterProfile;
use crate::types::Listing;

/// Masks the automation flag before any page script runs.
const STEALTH_INIT_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined
    });
"#;

pub trait ListingSource {
    fn fetch_listings(
        &self,
        profile: &FilterProfile,
    ) -> impl Future<Output = Result<Vec<Listing>>> + Send;
}

pub struct SourceClient {
    base_url: String,
}

impl SourceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_via_browser(&self, search_url: &str, request_url: &str) -> Result<Vec<Listing>> {
        let (mut browser, mut handler) = Browser::launch(browser_config()?).await?;
        let driver = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let outcome = fetch_in_session(&browser, search_url, request_url).await;

        if let Err(e) = browser.close().await {
            debug!("browser close failed: {e}");
        }
        let _ = browser.wait().await;
        driver.abort();

        outcome
    }
}

impl ListingSource for SourceClient {
    async fn fetch_listings(&self, profile: &FilterProfile) -> Result<Vec<Listing>> {
        let query = search_query(profile);
        let search_url = format!("{}/en/search/results?{query}", self.base_url);
        let request_url = format!("{}/app/search/request?{query}", self.base_url);

        info!(profile = profile.slug, "fetching listings via browser session");
        match tokio::time::timeout(
            Duration::from_secs(SOURCE_FETCH_TIMEOUT_SECS),
            self.fetch_via_browser(&search_url, &request_url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Fetch(format!(
                "source fetch timed out after {SOURCE_FETCH_TIMEOUT_SECS}s"
            ))),
        }
    }
}

fn browser_config() -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .no_sandbox()
        .window_size(1280, 720)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-setuid-sandbox")
        .build()
        .map_err(AppError::Fetch)
}

async fn fetch_in_session(
    browser: &Browser,
    search_url: &str,
    request_url: &str,
) -> Result<Vec<Listing>> {
    let page = browser.new_page("about:blank").await?;

    let ua = SetUserAgentOverrideParams::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(AppError::Fetch)?;
    page.set_user_agent(ua).await?;

    let stealth = AddScriptToEvaluateOnNewDocumentParams::builder()
        .source(STEALTH_INIT_SCRIPT)
        .build()
        .map_err(AppError::Fetch)?;
    page.execute(stealth).await?;

    page.goto(search_url).await?;
    page.wait_for_navigation().await?;
    tokio::time::sleep(Duration::from_millis(CHALLENGE_SETTLE_MS)).await;

    let eval = page
        .evaluate_function(session_fetch_script(request_url))
        .await?;
    let resp: BrowserFetchResponse = eval
        .into_value()
        .map_err(|e| AppError::Fetch(format!("malformed browser fetch result: {e}")))?;

    if resp.status != 200 {
        return Err(AppError::Fetch(format!(
            "search request failed with status {}, body preview: {}",
            resp.status,
            preview(&resp.body)
        )));
    }

    parse_search_payload(&resp.body)
}

/// In-page fetch runs with the session's challenge-clearance cookies.
fn session_fetch_script(request_url: &str) -> String {
    format!(
        r#"async () => {{
            const res = await fetch("{request_url}", {{
                method: "GET",
                headers: {{
                    "Accept": "application/json, text/plain, */*",
                    "X-Requested-With": "XMLHttpRequest"
                }},
                credentials: "include"
            }});
            const text = await res.text();
            return {{ status: res.status, body: text }};
        }}"#
    )
}

#[derive(Debug, Deserialize)]
struct BrowserFetchResponse {
    status: u16,
    body: String,
}

/// Query string for both the rendered search page and the JSON endpoint.
/// Filter values are fixed and URL-safe, so no percent-encoding is needed.
fn search_query(profile: &FilterProfile) -> String {
    let mut parts: Vec<String> = profile
        .filters
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    parts.push("page=1".to_string());
    parts.push(format!("per-page={SEARCH_PAGE_SIZE}"));
    parts.join("&")
}

/// The expected envelope is a JSON object with a top-level `data` array.
fn parse_search_payload(body: &str) -> Result<Vec<Listing>> {
    let payload: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::Fetch(format!("unparseable search payload: {e}")))?;
    let data = payload
        .get("data")
        .ok_or_else(|| AppError::Fetch("unexpected search payload format".to_string()))?;
    serde_json::from_value(data.clone())
        .map_err(|e| AppError::Fetch(format!("unexpected listing shape: {e}")))
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{LEXUS_NX, TOYOTA_HYBRID};

    #[test]
    fn query_includes_filters_and_pagination() {
        let query = search_query(&TOYOTA_HYBRID);
        assert!(query.contains("make=Toyota"));
        assert!(query.contains("fuel-type=Hybrid"));
        assert!(query.contains("page=1"));
        assert!(query.ends_with("per-page=50"));
    }

    #[test]
    fn query_reflects_profile_specific_filters() {
        let query = search_query(&LEXUS_NX);
        assert!(query.contains("make=Lexus"));
        assert!(query.contains("model=NX"));
        assert!(query.contains("year-to=2026"));
        assert!(!query.contains("fuel-type"));
    }

    #[test]
    fn parses_data_envelope() {
        let body = r#"{"data": [{"lot": "111"}, {"lot": "222", "vin": "X"}]}"#;
        let listings = parse_search_payload(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].lot, "111");
        assert_eq!(listings[1].vin.as_deref(), Some("X"));
    }

    #[test]
    fn empty_data_array_is_valid() {
        let listings = parse_search_payload(r#"{"data": []}"#).unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn missing_data_field_is_an_error() {
        let err = parse_search_payload(r#"{"rows": []}"#).unwrap_err();
        assert!(err.to_string().contains("unexpected search payload format"));
    }

    #[test]
    fn unparseable_body_is_an_error() {
        let err = parse_search_payload("<html>challenge</html>").unwrap_err();
        assert!(err.to_string().contains("unparseable"));
    }
}
