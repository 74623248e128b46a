use std::collections::HashMap;

use redesign_core::DataType;
use serde::{Deserialize, Serialize};

use crate::snapshot::{FieldSnapshot, ResourceSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptField {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptDataModel {
    pub name: String,
    pub fields: Vec<PromptField>,
}

/// What the generation backend receives as the `userInput` parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionPromptPayload {
    pub data_models: Vec<PromptDataModel>,
}

/// Map a field data type onto the small primitive vocabulary the model reasons in.
pub fn primitive_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::SingleLineText
        | DataType::MultiLineText
        | DataType::Email
        | DataType::GeographicLocation
        | DataType::Roles
        | DataType::Username
        | DataType::Password
        | DataType::Json => "string",
        DataType::WholeNumber | DataType::Id => "int",
        DataType::DecimalNumber => "float",
        DataType::Boolean => "bool",
        DataType::DateTime | DataType::CreatedAt | DataType::UpdatedAt => "datetime",
        DataType::Lookup | DataType::OptionSet | DataType::MultiSelectOptionSet => "enum",
    }
}

fn field_type(field: &FieldSnapshot, entity_names: &HashMap<&str, &str>) -> String {
    if field.data_type != DataType::Lookup {
        return primitive_type(field.data_type).to_string();
    }
    match field
        .related_entity_id()
        .and_then(|id| entity_names.get(id))
    {
        Some(name) => name.to_string(),
        None => {
            tracing::warn!(
                field = %field.name,
                related_entity_id = ?field.related_entity_id(),
                "lookup target not in snapshot, sending primitive type"
            );
            primitive_type(field.data_type).to_string()
        }
    }
}

/// Convert a resource snapshot into the structural form sent for generation.
/// Relation fields carry the related entity's name instead of a primitive type.
pub fn build_payload(resource: &ResourceSnapshot) -> DecompositionPromptPayload {
    let entity_names: HashMap<&str, &str> = resource
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();

    DecompositionPromptPayload {
        data_models: resource
            .entities
            .iter()
            .map(|entity| PromptDataModel {
                name: entity.name.clone(),
                fields: entity
                    .fields
                    .iter()
                    .map(|field| PromptField {
                        name: field.name.clone(),
                        data_type: field_type(field, &entity_names),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn user_message(resource: &ResourceSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(&build_payload(resource))
}

pub fn break_the_monolith_system_prompt() -> String {
    format!(
        "You are a software architect helping a team break a monolithic service into microservices.\n\n\
The user message is a JSON object describing the monolith's data models: \
{{\"dataModels\":[{{\"name\":\"<data model>\",\"fields\":[{{\"name\":\"<field>\",\"dataType\":\"<type>\"}}]}}]}}. \
A field's dataType is one of string, int, float, bool, datetime, enum, or the name of another \
data model when the field references it.\n\n\
Propose a decomposition into microservices. \
Output ONLY a JSON object of the form \
{{\"microservices\":[{{\"name\":\"<service name>\",\"functionality\":\"<one sentence>\",\"dataModels\":[\"<data model name>\"]}}]}}. \
Do not wrap it in Markdown and do not add commentary.\n\n\
## Decomposition Guidelines\n{}\n\n\
Output ONLY the JSON object, nothing else.",
        redesign_core::guidelines::GUIDELINES
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::project;
    use crate::snapshot::tests::{entity, field, lookup, resource};

    #[test]
    fn every_data_type_maps_into_the_vocabulary() {
        let vocabulary = ["string", "int", "float", "bool", "datetime", "enum"];
        for data_type in DataType::ALL {
            assert!(
                vocabulary.contains(&primitive_type(data_type)),
                "{data_type:?} mapped outside the vocabulary"
            );
        }
    }

    #[test]
    fn representative_mappings() {
        assert_eq!(primitive_type(DataType::Email), "string");
        assert_eq!(primitive_type(DataType::Id), "int");
        assert_eq!(primitive_type(DataType::DecimalNumber), "float");
        assert_eq!(primitive_type(DataType::Boolean), "bool");
        assert_eq!(primitive_type(DataType::UpdatedAt), "datetime");
        assert_eq!(primitive_type(DataType::MultiSelectOptionSet), "enum");
        assert_eq!(primitive_type(DataType::Json), "string");
    }

    #[test]
    fn lookups_carry_the_related_entity_name() {
        let snap = project(&resource(vec![
            entity("c1", "Customer", vec![field("email", DataType::Email)]),
            entity(
                "o1",
                "Order",
                vec![field("total", DataType::DecimalNumber), lookup("customer", "c1")],
            ),
        ]));

        let payload = build_payload(&snap);
        let order = &payload.data_models[1];
        assert_eq!(order.name, "Order");
        assert_eq!(order.fields[0].data_type, "float");
        assert_eq!(order.fields[1].data_type, "Customer");
    }

    #[test]
    fn dangling_lookup_falls_back_to_enum() {
        let snap = project(&resource(vec![entity(
            "o1",
            "Order",
            vec![lookup("customer", "missing"), field("tag", DataType::Lookup)],
        )]));

        let payload = build_payload(&snap);
        assert_eq!(payload.data_models[0].fields[0].data_type, "enum");
        assert_eq!(payload.data_models[0].fields[1].data_type, "enum");
    }

    #[test]
    fn user_message_is_camel_case_json() {
        let snap = project(&resource(vec![entity(
            "o1",
            "Order",
            vec![field("createdAt", DataType::CreatedAt)],
        )]));
        let msg = user_message(&snap).unwrap();
        assert_eq!(
            msg,
            r#"{"dataModels":[{"name":"Order","fields":[{"name":"createdAt","dataType":"datetime"}]}]}"#
        );
    }

    #[test]
    fn system_prompt_describes_output_and_guidelines() {
        let prompt = break_the_monolith_system_prompt();
        assert!(prompt.contains("\"microservices\""));
        assert!(prompt.contains("dataModels"));
        assert!(prompt.contains(redesign_core::guidelines::GUIDELINES));
    }
}
