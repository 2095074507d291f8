//! Alert formatting and Telegram delivery. Formatting is pure and total:
//! missing attributes render as an explicit marker, never an error. Delivery
//! failures are downgraded to `false` and logged; they never abort a run.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::TELEGRAM_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::types::Listing;

const NOT_AVAILABLE: &str = "N/A";

pub trait Notify {
    /// Delivers one formatted alert. True only when the transport's own
    /// acknowledgement field confirms success.
    fn deliver(&self, text: &str) -> impl Future<Output = bool> + Send;
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TELEGRAM_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("telegram client build failed: {e}")))?;
        Ok(Self {
            client,
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

impl Notify for TelegramNotifier {
    async fn deliver(&self, text: &str) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": false,
        });

        let resp = match self.client.post(&url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Telegram send failed: {e}");
                return false;
            }
        };
        if !resp.status().is_success() {
            warn!("Telegram send failed with status {}", resp.status());
            return false;
        }
        match resp.json::<serde_json::Value>().await {
            Ok(body) => body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            Err(e) => {
                warn!("Telegram response unparseable: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Renders one listing as a Telegram HTML message. The display year is the
/// first whitespace token of `name` by source convention.
pub fn format_listing_message(prefix: &str, listing: &Listing) -> String {
    let title = listing
        .name_long
        .as_deref()
        .or(listing.name.as_deref())
        .unwrap_or("Unknown");
    let lot = non_empty_or(&listing.lot, NOT_AVAILABLE);
    let vin = listing.vin.as_deref().unwrap_or(NOT_AVAILABLE);
    let year = display_year(listing);
    let odometer = listing.odometer_substr.as_deref().unwrap_or(NOT_AVAILABLE);
    let location = listing.location.as_deref().unwrap_or(NOT_AVAILABLE);
    let prebid = listing.prebid_price.as_deref().unwrap_or(NOT_AVAILABLE);
    let status = listing.search_status.as_deref().unwrap_or(NOT_AVAILABLE);
    let url = format!("https://bid.cars/en/lot/{lot}");

    let mut lines = vec![
        prefix.to_string(),
        String::new(),
        format!("<b>{title}</b>"),
        String::new(),
        format!("📅 Year: {year}"),
        format!("🔢 Lot: <code>{lot}</code>"),
        format!("🔑 VIN: <code>{vin}</code>"),
        format!("📊 Odometer: {odometer}K miles"),
        format!("📍 Location: {location}"),
        format!("💰 Prebid: {prebid}"),
    ];
    if let Some(final_bid) = listing.final_bid_formatted.as_deref() {
        lines.push(format!("🏆 Final Bid: {final_bid}"));
    }
    lines.push(format!("📌 Status: {status}"));
    lines.push(String::new());
    lines.push(format!("🔗 <a href=\"{url}\">View on Bid.cars</a>"));
    lines.join("\n")
}

fn display_year(listing: &Listing) -> &str {
    listing
        .name
        .as_deref()
        .and_then(|n| n.split_whitespace().next())
        .unwrap_or(NOT_AVAILABLE)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_listing() -> Listing {
        Listing {
            lot: "54321".to_string(),
            vin: Some("JTMDJREV5HD123456".to_string()),
            name: Some("2019 Toyota RAV4".to_string()),
            name_long: Some("2019 Toyota RAV4 XLE Hybrid".to_string()),
            odometer_substr: Some("42".to_string()),
            location: Some("NY - Newburgh".to_string()),
            prebid_price: Some("$14,200".to_string()),
            final_bid_formatted: None,
            search_status: Some("Fast-buy".to_string()),
        }
    }

    #[test]
    fn formats_full_listing() {
        let msg = format_listing_message("🚗 prefix", &full_listing());
        assert!(msg.starts_with("🚗 prefix\n"));
        assert!(msg.contains("<b>2019 Toyota RAV4 XLE Hybrid</b>"));
        assert!(msg.contains("📅 Year: 2019"));
        assert!(msg.contains("🔢 Lot: <code>54321</code>"));
        assert!(msg.contains("📊 Odometer: 42K miles"));
        assert!(msg.contains("https://bid.cars/en/lot/54321"));
        assert!(!msg.contains("Final Bid"));
    }

    #[test]
    fn missing_attributes_render_as_markers() {
        let listing = Listing {
            lot: "9".to_string(),
            ..Default::default()
        };
        let msg = format_listing_message("p", &listing);
        assert!(msg.contains("<b>Unknown</b>"));
        assert!(msg.contains("📅 Year: N/A"));
        assert!(msg.contains("🔑 VIN: <code>N/A</code>"));
        assert!(msg.contains("📍 Location: N/A"));
    }

    #[test]
    fn title_falls_back_to_short_name() {
        let mut listing = full_listing();
        listing.name_long = None;
        let msg = format_listing_message("p", &listing);
        assert!(msg.contains("<b>2019 Toyota RAV4</b>"));
    }

    #[test]
    fn final_bid_line_only_when_present() {
        let mut listing = full_listing();
        listing.final_bid_formatted = Some("$15,800".to_string());
        let msg = format_listing_message("p", &listing);
        assert!(msg.contains("🏆 Final Bid: $15,800"));
    }

    #[test]
    fn year_is_first_token_of_short_name() {
        let mut listing = full_listing();
        listing.name = Some("2021 Lexus NX 300h".to_string());
        let msg = format_listing_message("p", &listing);
        assert!(msg.contains("📅 Year: 2021"));
    }
}
