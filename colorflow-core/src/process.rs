//! C4 — Process Graph. Owns the task/graph registries, the token queue, the
//! join predecessor sets and buffers, and the completed list. Grounded in
//! `entity/process.py` (task graph = Petri-net transitions) from the
//! original prototype and in the teacher's `compiler/verifier.rs` for the
//! shape of static graph validation (reachability/cycle checks over an
//! id-keyed adjacency, one `VerifyError`-style record per violation).

use crate::chain::ChainValidator;
use crate::error::GraphError;
use crate::merge;
use crate::types::Task;
use crate::types::Token;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A process: a directed acyclic graph of tasks, plus the live queue and
/// join buffers for tokens flowing through it.
pub struct Process {
    pub process_id: String,
    tasks: HashMap<String, Task>,
    graph: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, HashSet<String>>,
    /// FIFO of `(task_id, token)` awaiting firing.
    token_queue: VecDeque<(String, Token)>,
    completed: Vec<Token>,
    /// `to_id → (from_id → token)`, insertion-ordered so merge sees tokens
    /// in arrival order rather than declaration order.
    pending: HashMap<String, IndexMap<String, Token>>,
    is_compiled: bool,
    error_count: u32,
    last_compile_errors: Vec<String>,
}

impl Process {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            tasks: HashMap::new(),
            graph: HashMap::new(),
            predecessors: HashMap::new(),
            token_queue: VecDeque::new(),
            completed: Vec::new(),
            pending: HashMap::new(),
            is_compiled: false,
            error_count: 0,
            last_compile_errors: Vec::new(),
        }
    }

    /// Registers a task. A duplicate id overwrites the existing definition
    /// with a warning; either way it invalidates any prior compile.
    pub fn add_task(&mut self, task: Task) {
        if self.tasks.contains_key(&task.task_id) {
            tracing::warn!(task_id = %task.task_id, "overwriting existing task definition");
        }
        self.graph.entry(task.task_id.clone()).or_default();
        self.predecessors.entry(task.task_id.clone()).or_default();
        self.tasks.insert(task.task_id.clone(), task);
        self.is_compiled = false;
    }

    /// Adds an arc `src → tgt`. Both must already be registered.
    pub fn add_link(&mut self, src: &str, tgt: &str) -> Result<(), GraphError> {
        if !self.tasks.contains_key(src) {
            return Err(GraphError::UnknownTask(src.to_string()));
        }
        if !self.tasks.contains_key(tgt) {
            return Err(GraphError::UnknownTask(tgt.to_string()));
        }
        self.graph.entry(src.to_string()).or_default().push(tgt.to_string());
        self.predecessors
            .entry(tgt.to_string())
            .or_default()
            .insert(src.to_string());
        self.is_compiled = false;
        Ok(())
    }

    /// Static validation: every arc passes the chain validator, and the
    /// graph is acyclic. Returns `true` and sets `is_compiled` iff
    /// `error_count == 0`.
    pub fn compile(&mut self, chain_validator: &ChainValidator) -> bool {
        self.error_count = 0;
        self.last_compile_errors.clear();

        let mut edges: Vec<(String, String)> = Vec::new();
        for (src, successors) in &self.graph {
            for tgt in successors {
                edges.push((src.clone(), tgt.clone()));
            }
        }
        edges.sort();

        for (src, tgt) in &edges {
            let producer = &self.tasks[src];
            let consumer = &self.tasks[tgt];
            if !chain_validator.validate_link(producer, consumer) {
                let message = format!("arc {src} -> {tgt} rejected by chain validator");
                tracing::error!(src, tgt, "chain validation rejected arc");
                self.last_compile_errors.push(message);
                self.error_count += 1;
            }
        }

        let (back_edge_count, back_edge_messages) = self.count_back_edges();
        self.error_count += back_edge_count;
        self.last_compile_errors.extend(back_edge_messages);

        if self.error_count == 0 {
            self.is_compiled = true;
            true
        } else {
            self.is_compiled = false;
            tracing::error!(
                process_id = %self.process_id,
                error_count = self.error_count,
                "compile failed"
            );
            false
        }
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn is_compiled(&self) -> bool {
        self.is_compiled
    }

    /// `Ok(())` if the last `compile` call succeeded, otherwise the
    /// accumulated reasons bundled as a single [`GraphError::CompileError`].
    pub fn compile_result(&self) -> Result<(), GraphError> {
        if self.error_count == 0 {
            Ok(())
        } else {
            Err(GraphError::CompileError {
                errors: self.last_compile_errors.clone(),
            })
        }
    }

    /// DFS with an explicit recursion stack (gray set); every back-edge
    /// encountered increments the count. Visits every task, including
    /// disconnected components, in deterministic (sorted) root order.
    fn count_back_edges(&self) -> (u32, Vec<String>) {
        let mut colors: HashMap<&str, Color> =
            self.tasks.keys().map(|k| (k.as_str(), Color::White)).collect();
        let mut roots: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        roots.sort_unstable();

        let mut count = 0;
        let mut messages = Vec::new();
        for root in roots {
            if colors[root] == Color::White {
                self.visit(root, &mut colors, &mut count, &mut messages);
            }
        }
        (count, messages)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        colors: &mut HashMap<&'a str, Color>,
        count: &mut u32,
        messages: &mut Vec<String>,
    ) {
        colors.insert(node, Color::Gray);
        if let Some(successors) = self.graph.get(node) {
            for succ in successors {
                let succ = succ.as_str();
                match colors.get(succ).copied() {
                    Some(Color::Gray) => {
                        tracing::error!(from = node, to = succ, "back-edge detected");
                        messages.push(format!("back-edge {node} -> {succ}"));
                        *count += 1;
                    }
                    Some(Color::Black) | None => {}
                    Some(Color::White) => {
                        self.visit(succ, colors, count, messages);
                    }
                }
            }
        }
        colors.insert(node, Color::Black);
    }

    /// Appends `(start_task_id, token)` to the queue. Logs a warning (does
    /// not fail) if the process hasn't been successfully compiled.
    pub fn inject_token(&mut self, start_task_id: &str, token: Token) {
        if !self.is_compiled {
            tracing::warn!(
                process_id = %self.process_id,
                start_task_id,
                "injecting token into an uncompiled process"
            );
        }
        self.token_queue.push_back((start_task_id.to_string(), token));
    }

    /// A join task's predecessor set — empty for a start task.
    pub fn predecessors_of(&self, task_id: &str) -> HashSet<String> {
        self.predecessors.get(task_id).cloned().unwrap_or_default()
    }

    /// Delivers `token` to `to_id` having arrived from `from_id`. Once every
    /// predecessor of `to_id` has arrived, merges the buffered tokens per
    /// `to_id`'s `merge_strategy` and re-enqueues the merged token.
    ///
    /// On `MergeConflict` the pending buffer is retained (not cleared) —
    /// spec §9 open question #1, resolved in favor of allowing the caller
    /// to retry with a corrected token.
    pub fn arrive_token(
        &mut self,
        from_id: &str,
        to_id: &str,
        token: Token,
    ) -> Result<(), crate::error::MergeError> {
        let buffer = self.pending.entry(to_id.to_string()).or_default();
        buffer.insert(from_id.to_string(), token);

        let expected = self.predecessors_of(to_id);
        let arrived: HashSet<String> = buffer.keys().cloned().collect();
        if arrived != expected {
            return Ok(());
        }

        let strategy = self.tasks[to_id].merge_strategy;
        let ordered_tokens: Vec<Token> = buffer.values().cloned().collect();

        match merge::merge(strategy, &ordered_tokens) {
            Ok(merged) => {
                self.pending.remove(to_id);
                self.token_queue.push_back((to_id.to_string(), merged));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(to_id, %err, "merge conflict, pending buffer retained");
                Err(err)
            }
        }
    }

    /// Successor task specs of `task_id`, in the order links were added.
    /// Returns owned clones (not references) so callers can freely mix this
    /// with a later `&mut self` call such as `arrive_token`.
    pub fn get_next_nodes(&self, task_id: &str) -> Vec<Task> {
        self.graph
            .get(task_id)
            .map(|ids| ids.iter().filter_map(|id| self.tasks.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn pop_queued(&mut self) -> Option<(String, Token)> {
        self.token_queue.pop_front()
    }

    pub fn push_completed(&mut self, token: Token) {
        self.completed.push(token);
    }

    pub fn completed(&self) -> &[Token] {
        &self.completed
    }

    pub fn queue_len(&self) -> usize {
        self.token_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::SpecCatalogue;
    use crate::types::{Layer, MergeStrategy, TaskType};
    use std::collections::HashMap as StdHashMap;

    fn task(id: &str, input_spec: &str, output_spec: &str) -> Task {
        Task {
            task_id: id.to_string(),
            type_: TaskType::Function,
            target: "mod:func".to_string(),
            config: StdHashMap::new(),
            layer: Layer::Computation,
            required_agent_roles: vec![],
            required_agent_types: vec![],
            guards: vec![],
            input_spec_id: input_spec.to_string(),
            output_spec_id: output_spec.to_string(),
            merge_strategy: MergeStrategy::Union,
            description: None,
        }
    }

    fn token(trace_id: &str) -> Token {
        Token::new(trace_id, "src", StdHashMap::new(), StdHashMap::new())
    }

    #[test]
    fn compile_succeeds_on_linear_matching_chain() {
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        let mut process = Process::new("p1");
        process.add_task(task("A", "in", "mid"));
        process.add_task(task("B", "mid", "out"));
        process.add_link("A", "B").unwrap();
        assert!(process.compile(&validator));
        assert!(process.is_compiled());
        assert_eq!(process.error_count(), 0);
    }

    #[test]
    fn compile_rejects_cycle() {
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        let mut process = Process::new("p1");
        process.add_task(task("A", "s", "s"));
        process.add_task(task("B", "s", "s"));
        process.add_task(task("C", "s", "s"));
        process.add_link("A", "B").unwrap();
        process.add_link("B", "C").unwrap();
        process.add_link("C", "A").unwrap();
        assert!(!process.compile(&validator));
        assert!(process.error_count() >= 1);
        assert!(!process.is_compiled());
        let err = process.compile_result().unwrap_err();
        assert!(matches!(err, GraphError::CompileError { errors } if !errors.is_empty()));
    }

    #[test]
    fn compile_visits_disconnected_components() {
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        let mut process = Process::new("p1");
        process.add_task(task("A", "s", "s"));
        process.add_task(task("B", "s", "s"));
        // No link at all between A and B — two separate components.
        assert!(process.compile(&validator));
    }

    #[test]
    fn add_link_rejects_unknown_task() {
        let mut process = Process::new("p1");
        process.add_task(task("A", "s", "s"));
        let err = process.add_link("A", "ghost").unwrap_err();
        assert_eq!(err, GraphError::UnknownTask("ghost".to_string()));
    }

    #[test]
    fn join_fires_only_once_all_predecessors_arrive() {
        let mut process = Process::new("p1");
        process.add_task(task("A", "s", "s"));
        process.add_task(task("B", "s", "s"));
        process.add_task(task("C", "s", "s"));
        process.add_link("A", "C").unwrap();
        process.add_link("B", "C").unwrap();

        process.arrive_token("A", "C", token("t1")).unwrap();
        assert_eq!(process.queue_len(), 0);

        process.arrive_token("B", "C", token("t1")).unwrap();
        assert_eq!(process.queue_len(), 1);
        let (task_id, _) = process.pop_queued().unwrap();
        assert_eq!(task_id, "C");
    }

    #[test]
    fn merge_conflict_retains_pending_buffer() {
        let mut process = Process::new("p1");
        let mut c_task = task("C", "s", "s");
        c_task.merge_strategy = MergeStrategy::Strict;
        process.add_task(task("A", "s", "s"));
        process.add_task(task("B", "s", "s"));
        process.add_task(c_task);
        process.add_link("A", "C").unwrap();
        process.add_link("B", "C").unwrap();

        let mut t1 = token("t1");
        t1.content.insert("x".to_string(), serde_json::json!(1));
        let mut t2 = token("t1");
        t2.content.insert("x".to_string(), serde_json::json!(2));

        process.arrive_token("A", "C", t1).unwrap();
        let err = process.arrive_token("B", "C", t2).unwrap_err();
        assert!(matches!(err, crate::error::MergeError::Conflict { .. }));
        assert_eq!(process.queue_len(), 0);
        assert_eq!(process.predecessors_of("C").len(), 2);
    }
}
