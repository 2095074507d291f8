use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One vehicle auction record as returned by the source's search endpoint.
/// Unknown upstream fields are ignored; missing ones default. A listing with
/// an empty `lot` is unusable for tracking and is excluded from both the
/// bootstrap baseline and the incremental delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub lot: String,
    pub vin: Option<String>,
    pub name: Option<String>,
    pub name_long: Option<String>,
    pub odometer_substr: Option<String>,
    pub location: Option<String>,
    pub prebid_price: Option<String>,
    /// Present only once an auction has closed.
    pub final_bid_formatted: Option<String>,
    pub search_status: Option<String>,
}

// ---------------------------------------------------------------------------
// Check outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckReason {
    Bootstrap,
    NoNewListings,
    DryRun,
    NewListings,
}

impl std::fmt::Display for CheckReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckReason::Bootstrap => "bootstrap",
            CheckReason::NoNewListings => "no_new_listings",
            CheckReason::DryRun => "dry_run",
            CheckReason::NewListings => "new_listings",
        };
        write!(f, "{s}")
    }
}

/// Summary of one orchestration run. Returned and logged, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub sent: usize,
    pub reason: CheckReason,
    pub total: usize,
    /// Delta size. Only meaningful once the run got past bootstrap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_tolerates_missing_and_unknown_fields() {
        let raw = r#"{
            "lot": "12345",
            "name": "2019 Toyota RAV4",
            "irrelevant_upstream_field": {"nested": true}
        }"#;
        let listing: Listing = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.lot, "12345");
        assert_eq!(listing.name.as_deref(), Some("2019 Toyota RAV4"));
        assert!(listing.vin.is_none());
        assert!(listing.final_bid_formatted.is_none());
    }

    #[test]
    fn listing_without_lot_defaults_to_empty() {
        let listing: Listing = serde_json::from_str(r#"{"vin": "JT123"}"#).unwrap();
        assert!(listing.lot.is_empty());
    }

    #[test]
    fn check_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CheckReason::NoNewListings).unwrap(),
            "\"no_new_listings\""
        );
        assert_eq!(CheckReason::DryRun.to_string(), "dry_run");
    }

    #[test]
    fn check_result_omits_absent_new_count() {
        let result = CheckResult {
            sent: 0,
            reason: CheckReason::Bootstrap,
            total: 7,
            new_count: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("new_count").is_none());
        assert_eq!(json["reason"], "bootstrap");
    }
}
