//! Cache key derivation.
//!
//! Keys are `<tier prefix><field>:<value>|<field>:<value>...` with the pairs
//! sorted by field name, so equal requests produce byte-identical keys no
//! matter how their parameters were ordered.

use std::fmt;

use serde::Serialize;

use super::params::NormalizedParams;
use super::rules::{Prefix, Render, USER_ID, rule_for, user_prefix};
use super::tier::Tier;

const PAIR_DELIMITER: &str = "|";
const SEARCH_TOKEN_DELIMITER: &str = ",";

/// A fully-qualified backend key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the key for `params` within `tier`.
///
/// Only the tier's whitelisted fields contribute; absent fields take the
/// tier's defaults. Returns `None` for [`Tier::Uncacheable`].
pub fn build_key(tier: Tier, params: &NormalizedParams) -> Option<CacheKey> {
    let rule = rule_for(tier)?;

    let mut pairs: Vec<(&str, String)> = rule
        .fields
        .iter()
        .flat_map(|group| group.iter())
        .filter_map(|field| {
            let value = match (params.rendered(field.name), field.render) {
                (Some(value), Render::Verbatim) => value,
                (Some(value), Render::SearchTokens) => normalize_search(&value),
                (None, _) => field.default?.to_string(),
            };
            Some((field.name, value))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut key = match rule.prefix {
        Prefix::Static(prefix) => prefix.to_string(),
        Prefix::PerUser => user_prefix(&params.rendered(USER_ID).unwrap_or_default()),
    };
    let body = pairs
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(PAIR_DELIMITER);
    key.push_str(&body);

    Some(CacheKey(key))
}

/// Canonicalize search text so word order does not matter.
///
/// Splits on any Unicode whitespace (including the ideographic space),
/// drops empty tokens, sorts the rest and joins them with a comma.
pub fn normalize_search(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(SEARCH_TOKEN_DELIMITER)
}
