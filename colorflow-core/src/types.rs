use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ─── Scalars ────────────────────────────────────────────────────

/// Topic relevance score, always clamped to `[0.0, 1.0]` by construction
/// sites; envelope validation re-checks it at firing time regardless.
pub type Relevance = f64;

// ─── Token ──────────────────────────────────────────────────────

/// A unit of work flowing through a process. Immutable envelope, content
/// replaced wholesale on evolution — no in-place mutation (spec §9).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub trace_id: String,
    pub source_id: String,
    /// Task ids already visited, append-only across evolutions.
    pub history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub content: HashMap<String, serde_json::Value>,
    pub topics: HashMap<String, Relevance>,
}

impl Token {
    pub fn new(
        trace_id: impl Into<String>,
        source_id: impl Into<String>,
        content: HashMap<String, serde_json::Value>,
        topics: HashMap<String, Relevance>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            source_id: source_id.into(),
            history: Vec::new(),
            created_at: Utc::now(),
            content,
            topics,
        }
    }

    /// Produce a successor token: same `trace_id`/`source_id`/`created_at`/
    /// `topics`, content replaced, history extended by exactly one task id.
    pub fn evolve(&self, task_id: &str, content: HashMap<String, serde_json::Value>) -> Token {
        let mut history = self.history.clone();
        history.push(task_id.to_string());
        Token {
            trace_id: self.trace_id.clone(),
            source_id: self.source_id.clone(),
            history,
            created_at: self.created_at,
            content,
            topics: self.topics.clone(),
        }
    }
}

// ─── Resource Spec (C1) ─────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Float,
    Int,
    Bool,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_required() -> bool {
    true
}

/// Frozen after load — a named field-constraint set a token's content is
/// validated against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub spec_id: String,
    pub associated_topic: String,
    /// `IndexMap` so field-declaration order survives deserialization (spec
    /// §4.2 validates "in declaration order" — a sorted map would silently
    /// reorder fields from whatever order they appear in source YAML/JSON).
    pub fields: IndexMap<String, FieldConstraint>,
}

// ─── Task / Guard (part of the Process Graph's data model, C4) ────

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Function,
    Api,
    Container,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Surface,
    Observation,
    Computation,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Union,
    Strict,
    Custom,
}

/// A small fixed vocabulary for who may act on a task, restored from
/// `Tasks/task_test.py` (`AgentRole.CONSULTANT`, `AgentNature.LLM`). Purely
/// descriptive — the firing pipeline never inspects these; a host scheduler
/// may use them to route work to the right kind of agent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Supervisor,
    Consultant,
    Worker,
    Other(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Llm,
    Human,
    Service,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub target_topic_id: String,
    pub min_relevance: Relevance,
    #[serde(default)]
    pub description: Option<String>,
}

/// Frozen after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    #[serde(rename = "type")]
    pub type_: TaskType,
    /// `module_path:symbol` resolver string — opaque to the engine, resolved
    /// via a host-supplied [`crate::resolver::Resolver`].
    pub target: String,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    pub layer: Layer,
    #[serde(default)]
    pub required_agent_roles: Vec<AgentRole>,
    #[serde(default)]
    pub required_agent_types: Vec<AgentKind>,
    #[serde(default)]
    pub guards: Vec<Guard>,
    pub input_spec_id: String,
    pub output_spec_id: String,
    pub merge_strategy: MergeStrategy,
    /// Non-functional — diagnostics only, never read by the firing pipeline
    /// (restored from `Tasks/task_test.py`'s `description` field).
    #[serde(default)]
    pub description: Option<String>,
}

// ─── Firing result ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiringResult {
    pub task_id: String,
    pub success: bool,
    pub message: String,
    pub new_token: Option<Token>,
    pub elapsed_ms: f64,
    pub routes_triggered: u32,
}

// ─── Topic catalogue (descriptive only) ────────────────────────

/// Restored from `entity/topics.py`: a documented vocabulary of topic ids.
/// Never consulted by the firing pipeline — guards and envelope validation
/// operate on the plain `topics: HashMap<String, Relevance>` score map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TopicCatalogue {
    descriptions: HashMap<String, String>,
}

impl TopicCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, description: impl Into<String>) {
        self.descriptions.insert(id.into(), description.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.descriptions.contains_key(id)
    }

    pub fn known_ids(&self) -> HashSet<&str> {
        self.descriptions.keys().map(String::as_str).collect()
    }
}
