//! Built-in filter profiles. A profile is pure data: the search parameters
//! that define which listings a watcher instance cares about, plus the
//! message prefix its alerts carry.

/// One watched search. `filters` are passed verbatim as query parameters of
/// the source's filtered-search endpoint.
#[derive(Debug, Clone)]
pub struct FilterProfile {
    pub slug: &'static str,
    pub message_prefix: &'static str,
    pub filters: &'static [(&'static str, &'static str)],
}

pub const TOYOTA_HYBRID: FilterProfile = FilterProfile {
    slug: "toyota",
    message_prefix: "🚗 ახალი Toyota (Bid.cars)",
    filters: &[
        ("search-type", "filters"),
        ("status", "Fast-buy"),
        ("type", "Automobile"),
        ("make", "Toyota"),
        ("year-from", "2017"),
        ("auction-type", "All"),
        ("odometer-to", "85000"),
        ("body-style", "SUV"),
        ("drive-type", "AWD"),
        ("fuel-type", "Hybrid"),
    ],
};

pub const LEXUS_NX: FilterProfile = FilterProfile {
    slug: "lexus-nx",
    message_prefix: "🚗 ახალი Lexus NX (Bid.cars)",
    filters: &[
        ("search-type", "filters"),
        ("status", "Fast-buy"),
        ("type", "Automobile"),
        ("make", "Lexus"),
        ("model", "NX"),
        ("year-from", "2017"),
        ("year-to", "2026"),
        ("auction-type", "All"),
        ("odometer-to", "85000"),
        ("body-style", "SUV"),
    ],
};

impl FilterProfile {
    pub fn all() -> Vec<FilterProfile> {
        vec![TOYOTA_HYBRID, LEXUS_NX]
    }

    /// Seen-set key, namespaced per profile so two watchers never suppress
    /// each other's alerts for overlapping lot ids.
    pub fn seen_key(&self) -> String {
        format!("bidcars:{}:seen-lots", self.slug)
    }

    /// Bootstrap marker key, namespaced like the seen-set.
    pub fn init_key(&self) -> String {
        format!("bidcars:{}:seen-initialized", self.slug)
    }

    /// Suffix used for per-profile credential environment variables,
    /// e.g. `lexus-nx` → `TELEGRAM_BOT_TOKEN__LEXUS_NX`.
    pub fn env_suffix(&self) -> String {
        self.slug.to_uppercase().replace('-', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_are_distinct_per_profile() {
        let profiles = FilterProfile::all();
        for a in &profiles {
            for b in &profiles {
                if a.slug != b.slug {
                    assert_ne!(a.seen_key(), b.seen_key());
                    assert_ne!(a.init_key(), b.init_key());
                }
            }
        }
    }

    #[test]
    fn env_suffix_uppercases_and_replaces_dashes() {
        assert_eq!(TOYOTA_HYBRID.env_suffix(), "TOYOTA");
        assert_eq!(LEXUS_NX.env_suffix(), "LEXUS_NX");
    }
}
