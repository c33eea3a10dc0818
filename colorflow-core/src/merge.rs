//! C5 — Merge Engine. Combines tokens that arrived at the same join into
//! one, per the task's declared `MergeStrategy`.

use crate::error::MergeError;
use crate::types::{MergeStrategy, Token};
use serde_json::Value;
use std::collections::HashMap;

/// Merge a non-empty, arrival-ordered list of tokens into one.
///
/// The merged token's `trace_id` is taken from the first input. `history` is
/// the concatenation of all inputs' histories in arrival order, de-duplicated
/// keeping each task id's first occurrence; `topics` is the union of all
/// inputs' topic maps, taking the max score per key. Both choices resolve
/// spec §9's open question #2 — the source left them unspecified.
pub fn merge(strategy: MergeStrategy, tokens: &[Token]) -> Result<Token, MergeError> {
    assert!(!tokens.is_empty(), "merge requires at least one token");

    let trace_id = tokens[0].trace_id.clone();
    let source_id = tokens[0].source_id.clone();
    let created_at = tokens[0].created_at;

    let content = match strategy {
        MergeStrategy::Union => merge_union(tokens),
        MergeStrategy::Strict => merge_strict(tokens)?,
        MergeStrategy::Custom => merge_custom(tokens),
    };

    Ok(Token {
        trace_id,
        source_id,
        history: merge_history(tokens),
        created_at,
        content,
        topics: merge_topics(tokens),
    })
}

fn merge_union(tokens: &[Token]) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for token in tokens {
        for (k, v) in &token.content {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

fn merge_strict(tokens: &[Token]) -> Result<HashMap<String, Value>, MergeError> {
    let mut out: HashMap<String, Value> = HashMap::new();
    for token in tokens {
        for (k, v) in &token.content {
            match out.get(k) {
                Some(existing) if existing != v => {
                    return Err(MergeError::Conflict {
                        key: k.clone(),
                        left: existing.clone(),
                        right: v.clone(),
                    });
                }
                _ => {
                    out.insert(k.clone(), v.clone());
                }
            }
        }
    }
    Ok(out)
}

fn merge_custom(tokens: &[Token]) -> HashMap<String, Value> {
    let inputs: Vec<Value> = tokens
        .iter()
        .map(|t| serde_json::to_value(&t.content).unwrap_or(Value::Null))
        .collect();
    HashMap::from([
        ("__inputs__".to_string(), Value::Array(inputs)),
        ("__meta__".to_string(), Value::String("bundled".to_string())),
    ])
}

fn merge_history(tokens: &[Token]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for token in tokens {
        for task_id in &token.history {
            if seen.insert(task_id.clone()) {
                out.push(task_id.clone());
            }
        }
    }
    out
}

fn merge_topics(tokens: &[Token]) -> HashMap<String, f64> {
    let mut out: HashMap<String, f64> = HashMap::new();
    for token in tokens {
        for (k, v) in &token.topics {
            out.entry(k.clone())
                .and_modify(|existing| {
                    if *v > *existing {
                        *existing = *v;
                    }
                })
                .or_insert(*v);
        }
    }
    out
}
