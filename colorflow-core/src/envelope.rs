//! Envelope validation: the cheap, schema-independent integrity check every
//! token passes before any content is touched — non-empty identity, topic
//! scores within bounds, and freshness against the configured TTL.

use crate::types::{Relevance, Token};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// `check(token, ttl) -> Ok(()) | Err(reason)` (spec §4.5's envelope layer,
/// distinct from the content-schema layer the Token Validator enforces).
pub fn check(token: &Token, ttl: Duration, now: DateTime<Utc>) -> Result<(), String> {
    if token.trace_id.trim().is_empty() {
        return Err("trace_id is empty".to_string());
    }

    for (topic, score) in &token.topics {
        if !is_valid_relevance(*score) {
            return Err(format!("topic '{topic}' score {score} out of bounds [0.0, 1.0]"));
        }
    }

    let age = now.signed_duration_since(token.created_at);
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    if age > ttl {
        return Err(format!("token expired: age {age} exceeds ttl {ttl}"));
    }

    Ok(())
}

fn is_valid_relevance(score: Relevance) -> bool {
    (0.0..=1.0).contains(&score)
}
