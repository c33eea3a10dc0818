//! Token-driven workflow engine modeled on colored Petri nets: tasks are
//! transitions, tokens are typed, topic-weighted artifacts that flow
//! through a compiled process graph, being validated, guarded, executed,
//! evolved and routed to their successors.

pub mod catalogue;
pub mod chain;
pub mod dto;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod merge;
pub mod process;
pub mod resolver;
pub mod store;
pub mod store_memory;
pub mod types;
pub mod validator;

pub use catalogue::SpecCatalogue;
pub use chain::ChainValidator;
pub use engine::FiringEngine;
pub use error::{EngineError, GraphError, MergeError, ValidationError};
pub use process::Process;
pub use resolver::{Handler, Resolver};
pub use store::{StoreError, TokenRepository};
pub use store_memory::MemoryTokenStore;
pub use types::{
    AgentKind, AgentRole, FieldConstraint, FieldType, FiringResult, Guard, Layer, MergeStrategy,
    ResourceSpec, Task, TaskType, Token, TopicCatalogue,
};
pub use validator::TokenValidator;
