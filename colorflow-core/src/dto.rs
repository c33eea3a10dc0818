//! YAML authoring layer: parses a process definition document into a
//! populated, uncompiled [`Process`]. Grounded in the teacher's
//! `authoring/dto.rs` + `authoring/yaml.rs` split — a `*Yaml` DTO struct
//! deserialized with `serde_yaml`, then converted field-by-field into the
//! domain type, with link references checked as they're added rather than
//! trusted blindly.

use crate::error::GraphError;
use crate::process::Process;
use crate::types::{AgentKind, AgentRole, Guard, Layer, MergeStrategy, Task, TaskType};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DtoError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Deserialize)]
struct ProcessYaml {
    process_id: String,
    tasks: Vec<TaskYaml>,
    #[serde(default)]
    links: Vec<LinkYaml>,
}

#[derive(Debug, Deserialize)]
struct TaskYaml {
    task_id: String,
    #[serde(rename = "type")]
    type_: TaskType,
    target: String,
    #[serde(default)]
    config: HashMap<String, serde_json::Value>,
    layer: Layer,
    #[serde(default)]
    required_agent_roles: Vec<AgentRole>,
    #[serde(default)]
    required_agent_types: Vec<AgentKind>,
    #[serde(default)]
    guards: Vec<Guard>,
    input_spec_id: String,
    output_spec_id: String,
    merge_strategy: MergeStrategy,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkYaml {
    src: String,
    tgt: String,
}

impl From<TaskYaml> for Task {
    fn from(dto: TaskYaml) -> Self {
        Task {
            task_id: dto.task_id,
            type_: dto.type_,
            target: dto.target,
            config: dto.config,
            layer: dto.layer,
            required_agent_roles: dto.required_agent_roles,
            required_agent_types: dto.required_agent_types,
            guards: dto.guards,
            input_spec_id: dto.input_spec_id,
            output_spec_id: dto.output_spec_id,
            merge_strategy: dto.merge_strategy,
            description: dto.description,
        }
    }
}

/// Parses a process definition document shaped as
/// `{ process_id, tasks: [...], links: [{src, tgt}, ...] }` into an
/// uncompiled `Process`. The caller still owns calling `compile` — parsing
/// a valid document never implies a compilable graph.
pub fn process_from_yaml_str(yaml: &str) -> Result<Process, DtoError> {
    let dto: ProcessYaml = serde_yaml::from_str(yaml)?;
    let mut process = Process::new(dto.process_id);
    for task in dto.tasks {
        process.add_task(task.into());
    }
    for link in dto.links {
        process.add_link(&link.src, &link.tgt)?;
    }
    Ok(process)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::SpecCatalogue;
    use crate::chain::ChainValidator;

    const YAML: &str = r#"
process_id: demo
tasks:
  - task_id: A
    type: function
    target: "mod:produce"
    layer: computation
    input_spec_id: none
    output_spec_id: none
    merge_strategy: union
  - task_id: B
    type: function
    target: "mod:consume"
    layer: computation
    input_spec_id: none
    output_spec_id: none
    merge_strategy: union
links:
  - src: A
    tgt: B
"#;

    #[test]
    fn parses_and_compiles() {
        let mut process = process_from_yaml_str(YAML).unwrap();
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        assert!(process.compile(&validator));
    }

    #[test]
    fn unknown_link_target_fails() {
        let yaml = r#"
process_id: demo
tasks:
  - task_id: A
    type: function
    target: "mod:produce"
    layer: computation
    input_spec_id: none
    output_spec_id: none
    merge_strategy: union
links:
  - src: A
    tgt: ghost
"#;
        let err = process_from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, DtoError::Graph(GraphError::UnknownTask(_))));
    }

    #[test]
    fn malformed_yaml_fails() {
        let err = process_from_yaml_str("not: [valid, process").unwrap_err();
        assert!(matches!(err, DtoError::Yaml(_)));
    }
}
