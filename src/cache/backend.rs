//! Key-value backend abstraction.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use glob::Pattern;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend does not support `{0}`")]
    Unsupported(&'static str),
    #[error("invalid key pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl BackendError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A shared, concurrently usable key-value store with per-entry TTL.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, BackendError>;

    /// Store `value`, replacing any previous entry and its TTL.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), BackendError>;

    /// Delete every key matching a glob `pattern`; returns how many were removed.
    ///
    /// Callers use `*` wildcards and `[...]` literal classes.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, BackendError> {
        let _ = pattern;
        Err(BackendError::Unsupported("delete_pattern"))
    }
}

/// Escape glob metacharacters so `value` matches only itself.
///
/// Uses bracket classes (`[*]`, `[\\]`), which both the in-process matcher
/// and Redis `SCAN MATCH` read as literals.
pub(crate) fn glob_escape(value: &str) -> String {
    Pattern::escape(value).replace('\\', "[\\\\]")
}

/// Compile a deletion pattern for the in-process backend.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, BackendError> {
    Pattern::new(pattern).map_err(|err| BackendError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.msg.to_string(),
    })
}
