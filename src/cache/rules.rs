//! Per-tier field whitelists and defaults.
//!
//! The classifier and the key builder both read these tables, so the fields a
//! tier is keyed on and the fields that decide the tier cannot drift apart.

use super::tier::Tier;

pub(crate) const SEARCH: &str = "search";
pub(crate) const USER_ID: &str = "userId";
pub(crate) const READ_FILTER: &str = "readFilter";

/// Any of these marks a tag-filtered request.
pub(crate) const TAG_FILTERS: [&str; 2] = ["tag", "tags"];

/// `readFilter` values that make a user-scoped request cacheable.
pub(crate) const CACHEABLE_READ_FILTERS: [&str; 2] = ["read", "unread"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Render {
    Verbatim,
    SearchTokens,
}

#[derive(Debug)]
pub(crate) struct FieldRule {
    pub name: &'static str,
    /// `None` means the field is omitted from the key when absent.
    pub default: Option<&'static str>,
    pub render: Render,
}

const fn field(name: &'static str, default: &'static str) -> FieldRule {
    FieldRule {
        name,
        default: Some(default),
        render: Render::Verbatim,
    }
}

#[derive(Debug)]
pub(crate) enum Prefix {
    Static(&'static str),
    /// `user:<userId>:articles:`
    PerUser,
}

#[derive(Debug)]
pub(crate) struct TierRule {
    pub prefix: Prefix,
    pub fields: &'static [&'static [FieldRule]],
}

pub(crate) const PUBLIC_PREFIX: &str = "articles:basic:";
pub(crate) const SEARCH_PREFIX: &str = "search:";

const LISTING: &[FieldRule] = &[
    field("page", "1"),
    field("limit", "20"),
    field("sortBy", "publishedAt"),
    field("sortOrder", "desc"),
    field("sources", "all"),
    field("category", "all"),
];

const READ_STATE: &[FieldRule] = &[field(READ_FILTER, "all")];

/// Present only when the request carries them.
const TAGS: &[FieldRule] = &[
    FieldRule {
        name: TAG_FILTERS[0],
        default: None,
        render: Render::Verbatim,
    },
    FieldRule {
        name: TAG_FILTERS[1],
        default: None,
        render: Render::Verbatim,
    },
];

const SEARCH_TEXT: &[FieldRule] = &[FieldRule {
    name: SEARCH,
    default: None,
    render: Render::SearchTokens,
}];

static PUBLIC_RULE: TierRule = TierRule {
    prefix: Prefix::Static(PUBLIC_PREFIX),
    fields: &[LISTING],
};

static USER_SCOPED_RULE: TierRule = TierRule {
    prefix: Prefix::PerUser,
    fields: &[LISTING, READ_STATE, TAGS],
};

static SEARCH_RULE: TierRule = TierRule {
    prefix: Prefix::Static(SEARCH_PREFIX),
    fields: &[LISTING, SEARCH_TEXT, TAGS],
};

pub(crate) fn rule_for(tier: Tier) -> Option<&'static TierRule> {
    match tier {
        Tier::Public => Some(&PUBLIC_RULE),
        Tier::UserScoped => Some(&USER_SCOPED_RULE),
        Tier::Search => Some(&SEARCH_RULE),
        Tier::Uncacheable => None,
    }
}

/// Key prefix owned by a single user's scoped entries.
pub(crate) fn user_prefix(user_id: &str) -> String {
    format!("user:{user_id}:articles:")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_cacheable_tier_has_a_rule() {
        for tier in Tier::CACHEABLE {
            assert!(rule_for(tier).is_some(), "missing rule for {tier}");
        }
        assert!(rule_for(Tier::Uncacheable).is_none());
    }

    #[test]
    fn field_names_are_unique_within_a_tier() {
        for tier in Tier::CACHEABLE {
            let rule = rule_for(tier).expect("rule");
            let mut seen = HashSet::new();
            for field in rule.fields.iter().flat_map(|group| group.iter()) {
                assert!(seen.insert(field.name), "{} repeated in {tier}", field.name);
            }
        }
    }

    #[test]
    fn routing_fields_never_default_into_public_keys() {
        let rule = rule_for(Tier::Public).expect("public rule");
        let names: Vec<_> = rule
            .fields
            .iter()
            .flat_map(|group| group.iter())
            .map(|field| field.name)
            .collect();

        for excluded in [SEARCH, USER_ID, READ_FILTER, TAG_FILTERS[0], TAG_FILTERS[1]] {
            assert!(!names.contains(&excluded));
        }
    }
}
