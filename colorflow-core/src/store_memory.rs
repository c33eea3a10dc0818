//! In-memory `TokenRepository`. Grounded in the teacher's `store_memory.rs`
//! `MemoryStore { inner: RwLock<Inner> }` shape.

use crate::store::{StoreError, TokenRepository};
use crate::types::Token;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    by_trace_id: HashMap<String, Token>,
}

#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Inner>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenStore {
    async fn save(&self, token: Token) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.by_trace_id.insert(token.trace_id.clone(), token);
        Ok(())
    }

    async fn load(&self, trace_id: &str) -> Result<Token, StoreError> {
        let inner = self.inner.read().await;
        inner
            .by_trace_id
            .get(trace_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(trace_id.to_string()))
    }

    async fn lookup_by_source(&self, source_id: &str) -> Result<Vec<Token>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_trace_id
            .values()
            .filter(|t| t.source_id == source_id)
            .cloned()
            .collect())
    }
}
