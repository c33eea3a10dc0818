//! Guard evaluation: a task only fires if the carrying token scores highly
//! enough on every topic the task cares about. Pure function, no state.

use crate::types::{Guard, Token};

/// The first guard the token fails, if any. `None` means every guard on
/// `guards` is satisfied (including the vacuous case of no guards).
pub fn first_failing<'a>(guards: &'a [Guard], token: &Token) -> Option<&'a Guard> {
    guards.iter().find(|guard| !passes(guard, token))
}

fn passes(guard: &Guard, token: &Token) -> bool {
    let score = token.topics.get(&guard.target_topic_id).copied().unwrap_or(0.0);
    score >= guard.min_relevance
}
