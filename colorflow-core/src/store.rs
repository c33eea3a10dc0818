//! C7 — Token Repository. Durable/queryable storage for tokens that have
//! left the live queue, grounded in the shape (if not the scale) of the
//! teacher's `ProcessStore` trait (`store.rs`): an `async_trait` with
//! `Result`-returning methods, organized by concern.

use crate::types::Token;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persists and retrieves tokens by `trace_id` or `source_id`. The default
/// in-memory implementation ([`crate::store_memory::MemoryTokenStore`]) is
/// the only one shipped here — durable/networked backends are a host
/// concern.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    // ── Writes ──
    async fn save(&self, token: Token) -> Result<(), StoreError>;

    // ── Reads ──
    async fn load(&self, trace_id: &str) -> Result<Token, StoreError>;
    async fn lookup_by_source(&self, source_id: &str) -> Result<Vec<Token>, StoreError>;
}
