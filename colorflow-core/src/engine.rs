//! C6 — Firing Engine. Drives one token through one task: dequeue, validate
//! envelope, check guards, validate input content, execute, validate output
//! content, evolve, route. Grounded step-for-step in the original
//! prototype's `engines/execution.ExecEngine.run_step`, including its
//! look-ahead guard re-check at routing time against the *evolved* token
//! rather than the one that was just consumed.

use crate::chain::ChainValidator;
use crate::envelope;
use crate::error::EngineError;
use crate::guard;
use crate::process::Process;
use crate::resolver::Resolver;
use crate::types::FiringResult;
use crate::validator::TokenValidator;
use std::time::{Duration, Instant};

pub struct FiringEngine<'a> {
    validator: TokenValidator<'a>,
    resolver: &'a Resolver,
    ttl: Duration,
}

impl<'a> FiringEngine<'a> {
    pub fn new(catalogue: &'a crate::catalogue::SpecCatalogue, resolver: &'a Resolver, ttl: Duration) -> Self {
        Self {
            validator: TokenValidator::new(catalogue),
            resolver,
            ttl,
        }
    }

    /// Runs one firing step. Returns `None` if the queue is empty; otherwise
    /// always returns a result — failures short-circuit the pipeline but are
    /// reported, never propagated as a Rust error.
    pub fn run_step(&self, process: &mut Process) -> Option<FiringResult> {
        let (task_id, token) = process.pop_queued()?;
        let started = Instant::now();

        let Some(task) = process.task(&task_id).cloned() else {
            return Some(FiringResult {
                task_id,
                success: false,
                message: "Token Integrity Fail: unknown task".to_string(),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        };

        if let Err(reason) = envelope::check(&token, self.ttl, chrono::Utc::now()) {
            tracing::warn!(task_id = %task_id, %reason, "token dropped at envelope check");
            let err = EngineError::TokenIntegrity(reason);
            return Some(FiringResult {
                task_id,
                success: false,
                message: err.step_message(),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        }

        if let Some(failed) = guard::first_failing(&task.guards, &token) {
            return Some(FiringResult {
                task_id,
                success: false,
                message: format!(
                    "Guard Condition Failed: topic '{}' below {}",
                    failed.target_topic_id, failed.min_relevance
                ),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        }

        if let Err(err) = self.validator.validate(&token.content, &task.input_spec_id) {
            let err = EngineError::Validation(err);
            return Some(FiringResult {
                task_id,
                success: false,
                message: format!("Input Spec Fail: {}", err.step_message()),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        }

        let Some(handler) = self.resolver.resolve(&task.target) else {
            let err = EngineError::RuntimeExecution(format!(
                "no handler registered for target '{}'",
                task.target
            ));
            return Some(FiringResult {
                task_id,
                success: false,
                message: err.step_message(),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        };

        let new_content = match handler.call(&token.content, &task.config) {
            Ok(content) => content,
            Err(reason) => {
                let err = EngineError::RuntimeExecution(reason);
                return Some(FiringResult {
                    task_id,
                    success: false,
                    message: err.step_message(),
                    new_token: None,
                    elapsed_ms: elapsed_ms(started),
                    routes_triggered: 0,
                });
            }
        };

        if let Err(err) = self.validator.validate(&new_content, &task.output_spec_id) {
            let err = EngineError::Validation(err);
            return Some(FiringResult {
                task_id,
                success: false,
                message: format!("Output Spec Fail: {}", err.step_message()),
                new_token: None,
                elapsed_ms: elapsed_ms(started),
                routes_triggered: 0,
            });
        }

        let new_token = token.evolve(&task_id, new_content);
        let has_successors = !process.get_next_nodes(&task_id).is_empty();
        let routes_triggered = self.route(process, &task_id, &new_token);

        if !has_successors {
            process.push_completed(new_token.clone());
        }

        Some(FiringResult {
            task_id,
            success: true,
            message: "OK".to_string(),
            new_token: Some(new_token),
            elapsed_ms: elapsed_ms(started),
            routes_triggered,
        })
    }

    /// Delivers `new_token` to every successor whose guards it still
    /// satisfies. A successor the evolved token no longer qualifies for is
    /// silently skipped — it never enters that branch's join buffer.
    fn route(&self, process: &mut Process, task_id: &str, new_token: &crate::types::Token) -> u32 {
        let mut count = 0;
        for successor in process.get_next_nodes(task_id) {
            if guard::first_failing(&successor.guards, new_token).is_some() {
                tracing::debug!(from = task_id, to = %successor.task_id, "route skipped, guard failed on evolved token");
                continue;
            }
            match process.arrive_token(task_id, &successor.task_id, new_token.clone()) {
                Ok(()) => count += 1,
                Err(err) => {
                    tracing::warn!(from = task_id, to = %successor.task_id, %err, "join merge failed");
                }
            }
        }
        count
    }

    /// Exposed so a host can reject compile-time-invalid graphs before ever
    /// calling `run_step` on them.
    pub fn chain_validator(catalogue: &'a crate::catalogue::SpecCatalogue) -> ChainValidator<'a> {
        ChainValidator::new(catalogue)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::SpecCatalogue;
    use crate::types::{Guard, Layer, MergeStrategy, ResourceSpec, Task, TaskType, Token};
    use indexmap::IndexMap;
    use std::collections::HashMap;

    /// A catalogue with a single `"none"` spec with no required fields —
    /// every test task below points at it so input/output validation never
    /// gets in the way of the behavior under test.
    fn catalogue_with_none() -> SpecCatalogue {
        let spec = ResourceSpec {
            spec_id: "none".to_string(),
            associated_topic: "none".to_string(),
            fields: IndexMap::new(),
        };
        SpecCatalogue::from_raw(HashMap::from([(
            "none".to_string(),
            serde_json::to_value(&spec).unwrap(),
        )]))
    }

    fn task(id: &str, target: &str, input_spec: &str, output_spec: &str, guards: Vec<Guard>) -> Task {
        Task {
            task_id: id.to_string(),
            type_: TaskType::Function,
            target: target.to_string(),
            config: HashMap::new(),
            layer: Layer::Computation,
            required_agent_roles: vec![],
            required_agent_types: vec![],
            guards,
            input_spec_id: input_spec.to_string(),
            output_spec_id: output_spec.to_string(),
            merge_strategy: MergeStrategy::Union,
            description: None,
        }
    }

    fn token(trace_id: &str) -> Token {
        Token::new(trace_id, "src", HashMap::new(), HashMap::new())
    }

    #[test]
    fn empty_queue_returns_none() {
        let catalogue = SpecCatalogue::new();
        let resolver = Resolver::new();
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));
        let mut process = Process::new("p1");
        assert!(engine.run_step(&mut process).is_none());
    }

    #[test]
    fn successful_leaf_firing_completes_token() {
        let catalogue = catalogue_with_none();
        let mut resolver = Resolver::new();
        resolver.register("mod:noop", |input: &HashMap<String, serde_json::Value>, _: &HashMap<String, serde_json::Value>| Ok(input.clone()));
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));

        let mut process = Process::new("p1");
        process.add_task(task("A", "mod:noop", "none", "none", vec![]));
        process.inject_token("A", token("t1"));

        let result = engine.run_step(&mut process).unwrap();
        assert!(result.success);
        assert_eq!(result.routes_triggered, 0);
        assert_eq!(process.completed().len(), 1);
    }

    #[test]
    fn guard_failure_blocks_firing() {
        let catalogue = SpecCatalogue::new();
        let mut resolver = Resolver::new();
        resolver.register("mod:noop", |input: &HashMap<String, serde_json::Value>, _: &HashMap<String, serde_json::Value>| Ok(input.clone()));
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));

        let mut process = Process::new("p1");
        let guards = vec![Guard {
            target_topic_id: "fin".to_string(),
            min_relevance: 0.9,
            description: None,
        }];
        process.add_task(task("A", "mod:noop", "none", "none", guards));
        process.inject_token("A", token("t1"));

        let result = engine.run_step(&mut process).unwrap();
        assert!(!result.success);
        assert!(result.message.starts_with("Guard Condition Failed"));
    }

    #[test]
    fn missing_handler_is_runtime_error() {
        let catalogue = catalogue_with_none();
        let resolver = Resolver::new();
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));

        let mut process = Process::new("p1");
        process.add_task(task("A", "mod:ghost", "none", "none", vec![]));
        process.inject_token("A", token("t1"));

        let result = engine.run_step(&mut process).unwrap();
        assert!(!result.success);
        assert!(result.message.starts_with("Runtime Execution Error"));
    }

    #[test]
    fn successor_ineligible_on_routing_guard_is_not_completed() {
        let catalogue = catalogue_with_none();
        let mut resolver = Resolver::new();
        resolver.register("mod:noop", |input: &HashMap<String, serde_json::Value>, _: &HashMap<String, serde_json::Value>| Ok(input.clone()));
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));

        let mut process = Process::new("p1");
        process.add_task(task("A", "mod:noop", "none", "none", vec![]));
        let guards = vec![Guard {
            target_topic_id: "fin".to_string(),
            min_relevance: 0.9,
            description: None,
        }];
        process.add_task(task("B", "mod:noop", "none", "none", guards));
        process.add_link("A", "B").unwrap();
        process.inject_token("A", token("t1"));

        let result = engine.run_step(&mut process).unwrap();
        assert!(result.success);
        assert_eq!(result.routes_triggered, 0);
        assert_eq!(process.queue_len(), 0);
        assert_eq!(
            process.completed().len(),
            0,
            "A has a successor, so the evolved token must not be completed even though routing to B was skipped"
        );
    }

    #[test]
    fn routes_to_successor_and_appends_history() {
        let catalogue = catalogue_with_none();
        let mut resolver = Resolver::new();
        resolver.register("mod:noop", |input: &HashMap<String, serde_json::Value>, _: &HashMap<String, serde_json::Value>| Ok(input.clone()));
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(60));

        let mut process = Process::new("p1");
        process.add_task(task("A", "mod:noop", "none", "none", vec![]));
        process.add_task(task("B", "mod:noop", "none", "none", vec![]));
        process.add_link("A", "B").unwrap();
        process.inject_token("A", token("t1"));

        let result = engine.run_step(&mut process).unwrap();
        assert!(result.success);
        assert_eq!(result.routes_triggered, 1);
        assert_eq!(process.queue_len(), 1);

        let result_b = engine.run_step(&mut process).unwrap();
        assert_eq!(result_b.new_token.unwrap().history, vec!["A", "B"]);
    }

    #[test]
    fn expired_token_fails_integrity_check() {
        let catalogue = SpecCatalogue::new();
        let resolver = Resolver::new();
        let engine = FiringEngine::new(&catalogue, &resolver, Duration::from_secs(1));

        let mut process = Process::new("p1");
        process.add_task(task("A", "mod:noop", "none", "none", vec![]));
        let mut stale = token("t1");
        stale.created_at = chrono::Utc::now() - chrono::Duration::hours(1);
        process.inject_token("A", stale);

        let result = engine.run_step(&mut process).unwrap();
        assert!(!result.success);
        assert!(result.message.starts_with("Token Integrity Fail"));
    }
}
