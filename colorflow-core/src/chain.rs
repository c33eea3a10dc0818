//! C3 — Chain Validator. Statically proves a producer's output spec is
//! compatible with a consumer's input spec, without touching any token.

use crate::catalogue::SpecCatalogue;
use crate::types::Task;

/// `validate_link(producer, consumer) → bool` (spec §4.3).
///
/// Rules, in order:
/// 1. Exact spec-id match accepts.
/// 2. Either spec missing from the catalogue rejects.
/// 3. Otherwise, structural compatibility: every field the consumer
///    requires must exist on the producer with the same type. Extra
///    producer fields are fine; a missing optional consumer field is fine.
///
/// Numeric bound widening/narrowing is deliberately not checked here — that
/// is a runtime concern the Token Validator enforces at the consumer
/// (spec §4.3's explicit design note).
pub struct ChainValidator<'a> {
    catalogue: &'a SpecCatalogue,
}

impl<'a> ChainValidator<'a> {
    pub fn new(catalogue: &'a SpecCatalogue) -> Self {
        Self { catalogue }
    }

    pub fn validate_link(&self, producer: &Task, consumer: &Task) -> bool {
        if producer.output_spec_id == consumer.input_spec_id {
            return true;
        }

        let Some(producer_spec) = self.catalogue.get(&producer.output_spec_id) else {
            return false;
        };
        let Some(consumer_spec) = self.catalogue.get(&consumer.input_spec_id) else {
            return false;
        };

        for (field_name, consumer_rule) in &consumer_spec.fields {
            match producer_spec.fields.get(field_name) {
                Some(producer_rule) => {
                    if producer_rule.type_ != consumer_rule.type_ {
                        return false;
                    }
                }
                None => {
                    if consumer_rule.required {
                        return false;
                    }
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldConstraint, FieldType, Layer, MergeStrategy, ResourceSpec, TaskType};
    use indexmap::IndexMap;
    use std::collections::HashMap;

    fn task(id: &str, input_spec: &str, output_spec: &str) -> Task {
        Task {
            task_id: id.to_string(),
            type_: TaskType::Function,
            target: "mod:func".to_string(),
            config: HashMap::new(),
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

    fn field(type_: FieldType, required: bool) -> FieldConstraint {
        FieldConstraint {
            type_,
            required,
            min_value: None,
            max_value: None,
            max_length: None,
            description: None,
        }
    }

    fn catalogue(specs: Vec<ResourceSpec>) -> SpecCatalogue {
        let raw = specs
            .into_iter()
            .map(|s| (s.spec_id.clone(), serde_json::to_value(&s).unwrap()))
            .collect();
        SpecCatalogue::from_raw(raw)
    }

    #[test]
    fn exact_match_accepts() {
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        let producer = task("A", "in1", "shared");
        let consumer = task("B", "shared", "out1");
        assert!(validator.validate_link(&producer, &consumer));
    }

    #[test]
    fn missing_spec_rejects() {
        let catalogue = SpecCatalogue::new();
        let validator = ChainValidator::new(&catalogue);
        let producer = task("A", "in1", "missing_out");
        let consumer = task("B", "missing_in", "out1");
        assert!(!validator.validate_link(&producer, &consumer));
    }

    #[test]
    fn structural_compat_allows_extra_producer_fields() {
        let mut producer_fields = IndexMap::new();
        producer_fields.insert("x".to_string(), field(FieldType::Int, true));
        producer_fields.insert("extra".to_string(), field(FieldType::String, true));
        let mut consumer_fields = IndexMap::new();
        consumer_fields.insert("x".to_string(), field(FieldType::Int, true));

        let catalogue = catalogue(vec![
            ResourceSpec {
                spec_id: "p_out".to_string(),
                associated_topic: "t".to_string(),
                fields: producer_fields,
            },
            ResourceSpec {
                spec_id: "c_in".to_string(),
                associated_topic: "t".to_string(),
                fields: consumer_fields,
            },
        ]);
        let validator = ChainValidator::new(&catalogue);
        let producer = task("A", "in1", "p_out");
        let consumer = task("B", "c_in", "out1");
        assert!(validator.validate_link(&producer, &consumer));
    }

    #[test]
    fn type_mismatch_on_required_field_rejects() {
        let mut producer_fields = IndexMap::new();
        producer_fields.insert("x".to_string(), field(FieldType::String, true));
        let mut consumer_fields = IndexMap::new();
        consumer_fields.insert("x".to_string(), field(FieldType::Int, true));

        let catalogue = catalogue(vec![
            ResourceSpec {
                spec_id: "p_out".to_string(),
                associated_topic: "t".to_string(),
                fields: producer_fields,
            },
            ResourceSpec {
                spec_id: "c_in".to_string(),
                associated_topic: "t".to_string(),
                fields: consumer_fields,
            },
        ]);
        let validator = ChainValidator::new(&catalogue);
        let producer = task("A", "in1", "p_out");
        let consumer = task("B", "c_in", "out1");
        assert!(!validator.validate_link(&producer, &consumer));
    }

    #[test]
    fn missing_optional_consumer_field_allowed() {
        let producer_fields = IndexMap::new();
        let mut consumer_fields = IndexMap::new();
        consumer_fields.insert("x".to_string(), field(FieldType::Int, false));

        let catalogue = catalogue(vec![
            ResourceSpec {
                spec_id: "p_out".to_string(),
                associated_topic: "t".to_string(),
                fields: producer_fields,
            },
            ResourceSpec {
                spec_id: "c_in".to_string(),
                associated_topic: "t".to_string(),
                fields: consumer_fields,
            },
        ]);
        let validator = ChainValidator::new(&catalogue);
        let producer = task("A", "in1", "p_out");
        let consumer = task("B", "c_in", "out1");
        assert!(validator.validate_link(&producer, &consumer));
    }
}
