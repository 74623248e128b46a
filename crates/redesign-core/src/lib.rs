pub mod guidelines;
pub mod settings;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use settings::{
    ai_configured, read_settings, read_settings_from, AiSettings,
    AnalyticsPolicy, AnalyticsSettings, BillingSettings, Settings, SettingsError, UserSettings,
};
pub use store::{FileSchemaStore, ResourceSummary, SchemaStore, StoreError};

// --- Types ---

/// Field data types a data model entity can declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
pub enum DataType {
    SingleLineText,
    MultiLineText,
    Email,
    WholeNumber,
    DateTime,
    DecimalNumber,
    Lookup,
    MultiSelectOptionSet,
    OptionSet,
    Boolean,
    GeographicLocation,
    Id,
    CreatedAt,
    UpdatedAt,
    Roles,
    Username,
    Password,
    Json,
}

impl DataType {
    pub const ALL: [DataType; 18] = [
        DataType::SingleLineText,
        DataType::MultiLineText,
        DataType::Email,
        DataType::WholeNumber,
        DataType::DateTime,
        DataType::DecimalNumber,
        DataType::Lookup,
        DataType::MultiSelectOptionSet,
        DataType::OptionSet,
        DataType::Boolean,
        DataType::GeographicLocation,
        DataType::Id,
        DataType::CreatedAt,
        DataType::UpdatedAt,
        DataType::Roles,
        DataType::Username,
        DataType::Password,
        DataType::Json,
    ];
}

/// Property key a `Lookup` field uses to point at its related entity.
pub const RELATED_ENTITY_ID: &str = "relatedEntityId";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub data_type: DataType,
    /// Free-form field properties, e.g. `{"relatedEntityId": "..."}` for lookups
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityVersion {
    pub version_number: u32,
    #[serde(default)]
    pub fields: Vec<EntityField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Set when the entity has been soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub versions: Vec<EntityVersion>,
}

impl Entity {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The baseline (working) version, number 0.
    pub fn baseline(&self) -> Option<&EntityVersion> {
        self.versions.iter().find(|v| v.version_number == 0)
    }
}

/// A service resource together with its data model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
}

/// The caller of a redesign operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Workspace>,
}

impl User {
    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace.as_ref().map(|w| w.id.as_str())
    }
}

// --- Storage ---

/// Resolve the global data directory (~/.redesign/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".redesign")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_uses_pascal_case_names() {
        let json = serde_json::to_string(&DataType::MultiSelectOptionSet).unwrap();
        assert_eq!(json, "\"MultiSelectOptionSet\"");
        let back: DataType = serde_json::from_str("\"GeographicLocation\"").unwrap();
        assert_eq!(back, DataType::GeographicLocation);
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let result: Result<DataType, _> = serde_json::from_str("\"Currency\"");
        assert!(result.is_err());
    }

    #[test]
    fn all_lists_every_variant_once() {
        let unique: std::collections::HashSet<_> = DataType::ALL.iter().collect();
        assert_eq!(unique.len(), DataType::ALL.len());
    }

    #[test]
    fn resource_reads_camel_case_json() {
        let raw = r#"{
            "id": "res-1",
            "name": "Shop",
            "project": {"id": "proj-1"},
            "entities": [{
                "id": "ent-1",
                "name": "Order",
                "displayName": "Order",
                "deletedAt": "2024-01-01T00:00:00Z",
                "versions": [{
                    "versionNumber": 0,
                    "fields": [{
                        "name": "customer",
                        "displayName": "Customer",
                        "dataType": "Lookup",
                        "properties": {"relatedEntityId": "ent-2"}
                    }]
                }]
            }]
        }"#;
        let resource: Resource = serde_json::from_str(raw).unwrap();
        assert_eq!(resource.project.as_ref().unwrap().id, "proj-1");
        let entity = &resource.entities[0];
        assert!(entity.is_deleted());
        let field = &entity.baseline().unwrap().fields[0];
        assert_eq!(field.data_type, DataType::Lookup);
        assert_eq!(field.properties[RELATED_ENTITY_ID], "ent-2");
    }

    #[test]
    fn baseline_is_version_zero() {
        let entity = Entity {
            id: "e".into(),
            name: "E".into(),
            display_name: String::new(),
            deleted_at: None,
            versions: vec![
                EntityVersion { version_number: 3, fields: vec![] },
                EntityVersion { version_number: 0, fields: vec![] },
            ],
        };
        assert_eq!(entity.baseline().unwrap().version_number, 0);
    }
}
