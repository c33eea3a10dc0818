//! C1 — Spec Catalogue. Parses a raw `spec_id → dict` mapping into frozen
//! `ResourceSpec`s. Grounded in `core/utils.load_resource_specs` (YAML file
//! → raw dict) and `specs/validators.ResourceSpecModel` (the parsed,
//! frozen shape) from the original prototype, and in the teacher's
//! `ContractRegistry::from_yaml_str` (`authoring/contracts.rs`) for the
//! YAML-loader shape.

use crate::types::ResourceSpec;
use std::collections::HashMap;

/// Registry of parsed `ResourceSpec`s. Lookup is by exact `spec_id`.
///
/// Per-entry parse failures are logged and the entry is dropped — catalogue
/// load itself never fails (spec §4.1).
#[derive(Clone, Debug, Default)]
pub struct SpecCatalogue {
    specs: HashMap<String, ResourceSpec>,
}

impl SpecCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalogue from an already-parsed mapping. This is the shape
    /// `spec.md` §6 describes as the external interface; raw values that
    /// don't deserialize into `ResourceSpec` (e.g. an unknown `type`) are
    /// dropped with a warning rather than failing the whole load.
    pub fn from_raw(raw: HashMap<String, serde_json::Value>) -> Self {
        let mut specs = HashMap::new();
        for (spec_id, value) in raw {
            match serde_json::from_value::<ResourceSpec>(value) {
                Ok(spec) => {
                    specs.insert(spec_id, spec);
                }
                Err(err) => {
                    tracing::warn!(spec_id, %err, "dropping malformed resource spec");
                }
            }
        }
        Self { specs }
    }

    /// Parse directly from a YAML document shaped as
    /// `{ spec_id: { associated_topic, fields: { name: {...} } } }`,
    /// the format `core/utils.py`'s `load_resource_specs` reads off disk.
    pub fn from_yaml_str(yaml: &str) -> Self {
        let raw: HashMap<String, serde_yaml::Value> = match serde_yaml::from_str(yaml) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%err, "spec catalogue YAML did not parse as a mapping; catalogue is empty");
                return Self::default();
            }
        };
        let mut specs = HashMap::new();
        for (spec_id, value) in raw {
            match serde_yaml::from_value::<ResourceSpec>(value) {
                Ok(spec) => {
                    specs.insert(spec_id, spec);
                }
                Err(err) => {
                    tracing::warn!(spec_id, %err, "dropping malformed resource spec");
                }
            }
        }
        Self { specs }
    }

    pub fn get(&self, spec_id: &str) -> Option<&ResourceSpec> {
        self.specs.get(spec_id)
    }

    pub fn contains(&self, spec_id: &str) -> bool {
        self.specs.contains_key(spec_id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
