//! Tier classification.

use std::fmt;

use serde::Serialize;

use super::params::NormalizedParams;
use super::rules::{CACHEABLE_READ_FILTERS, READ_FILTER, SEARCH, TAG_FILTERS, USER_ID};

/// The cache tier a request is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Public,
    UserScoped,
    Search,
    Uncacheable,
}

impl Tier {
    pub const CACHEABLE: [Tier; 3] = [Tier::Public, Tier::UserScoped, Tier::Search];

    /// Stable label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::UserScoped => "user_scoped",
            Tier::Search => "search",
            Tier::Uncacheable => "uncacheable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Assign a request to exactly one tier.
///
/// Checked in order, first match wins: non-empty `search` is always
/// [`Tier::Search`]; a `userId` with a `read`/`unread` filter is
/// [`Tier::UserScoped`]; a request with no search, user, read filter or tag
/// filter is [`Tier::Public`]; everything else is [`Tier::Uncacheable`].
pub fn classify(params: &NormalizedParams) -> Tier {
    if params.contains(SEARCH) {
        return Tier::Search;
    }

    let user_id = params.contains(USER_ID);
    let read_filter = params.rendered(READ_FILTER);

    if user_id
        && read_filter
            .as_deref()
            .is_some_and(|value| CACHEABLE_READ_FILTERS.contains(&value))
    {
        return Tier::UserScoped;
    }

    let tagged = TAG_FILTERS.iter().any(|name| params.contains(name));
    if !user_id && read_filter.is_none() && !tagged {
        return Tier::Public;
    }

    Tier::Uncacheable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryParams;

    fn tier_of(params: QueryParams) -> Tier {
        classify(&params.normalize())
    }

    #[test]
    fn empty_request_is_public() {
        assert_eq!(tier_of(QueryParams::new()), Tier::Public);
    }

    #[test]
    fn pagination_and_sort_are_public() {
        let params = QueryParams::new()
            .with("page", 3)
            .with("limit", 50)
            .with("sortBy", "qualityScore")
            .with("sources", "qiita,zenn");
        assert_eq!(tier_of(params), Tier::Public);
    }

    #[test]
    fn search_wins_over_user_scope() {
        let params = QueryParams::new()
            .with("search", "rust")
            .with("userId", "u1")
            .with("readFilter", "unread")
            .with("tag", "react");
        assert_eq!(tier_of(params), Tier::Search);
    }

    #[test]
    fn blank_search_does_not_select_search_tier() {
        let params = QueryParams::new().with("search", "  ").with("page", 2);
        assert_eq!(tier_of(params), Tier::Public);
    }

    #[test]
    fn user_with_read_filter_is_user_scoped() {
        for filter in ["read", "unread"] {
            let params = QueryParams::new()
                .with("userId", "u1")
                .with("readFilter", filter);
            assert_eq!(tier_of(params), Tier::UserScoped);
        }
    }

    #[test]
    fn unknown_read_filter_is_uncacheable() {
        let params = QueryParams::new()
            .with("userId", "u1")
            .with("readFilter", "archived");
        assert_eq!(tier_of(params), Tier::Uncacheable);
    }

    #[test]
    fn user_without_read_filter_is_uncacheable() {
        let params = QueryParams::new().with("userId", "u1");
        assert_eq!(tier_of(params), Tier::Uncacheable);
    }

    #[test]
    fn read_filter_without_user_is_uncacheable() {
        let params = QueryParams::new().with("readFilter", "unread");
        assert_eq!(tier_of(params), Tier::Uncacheable);
    }

    #[test]
    fn tag_filters_are_never_cached() {
        assert_eq!(
            tier_of(QueryParams::new().with("tag", "react")),
            Tier::Uncacheable
        );
        assert_eq!(
            tier_of(QueryParams::new().with("tags", "react,nextjs")),
            Tier::Uncacheable
        );
    }

    #[test]
    fn tagged_requests_keep_their_tier_but_not_the_untagged_key() {
        use crate::cache::build_key;

        let key_of = |params: QueryParams| {
            let normalized = params.normalize();
            let tier = classify(&normalized);
            (tier, build_key(tier, &normalized))
        };

        let user = QueryParams::new()
            .with("userId", "u1")
            .with("readFilter", "read");
        let (untagged_tier, untagged) = key_of(user.clone());
        let (tagged_tier, tagged) = key_of(user.with("tag", "react"));
        assert_eq!(untagged_tier, Tier::UserScoped);
        assert_eq!(tagged_tier, Tier::UserScoped);
        assert_ne!(untagged, tagged);

        let search = QueryParams::new().with("search", "rust");
        let (untagged_tier, untagged) = key_of(search.clone());
        let (tagged_tier, tagged) = key_of(search.with("tags", "wasm"));
        assert_eq!(untagged_tier, Tier::Search);
        assert_eq!(tagged_tier, Tier::Search);
        assert_ne!(untagged, tagged);
    }

    #[test]
    fn classification_covers_every_field_combination() {
        let fields: [(&str, &str); 5] = [
            ("search", "rust"),
            ("userId", "u1"),
            ("readFilter", "unread"),
            ("tag", "react"),
            ("page", "2"),
        ];

        for mask in 0_u32..(1 << fields.len()) {
            let params: QueryParams = fields
                .iter()
                .enumerate()
                .map(|(bit, (name, value))| (*name, (mask & (1 << bit) != 0).then_some(*value)))
                .collect();
            let normalized = params.normalize();
            let tier = classify(&normalized);

            if normalized.contains("search") {
                assert_eq!(tier, Tier::Search, "mask {mask:05b}");
            } else if normalized.contains("userId") && normalized.contains("readFilter") {
                assert_eq!(tier, Tier::UserScoped, "mask {mask:05b}");
            } else if normalized.contains("userId")
                || normalized.contains("readFilter")
                || normalized.contains("tag")
            {
                assert_eq!(tier, Tier::Uncacheable, "mask {mask:05b}");
            } else {
                assert_eq!(tier, Tier::Public, "mask {mask:05b}");
            }
        }
    }
}
