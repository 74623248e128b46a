//! Point-in-time projection of a stored resource into the shape the
//! redesign pipeline works on: live entities only, baseline fields only.

use redesign_core::{DataType, Entity, Project, Resource, SchemaStore};
use serde::{Deserialize, Serialize};

use crate::error::{RedesignError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnapshot {
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl FieldSnapshot {
    pub fn related_entity_id(&self) -> Option<&str> {
        self.properties
            .get(redesign_core::RELATED_ENTITY_ID)
            .and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub fields: Vec<FieldSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub entities: Vec<EntitySnapshot>,
}

impl ResourceSnapshot {
    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.id.as_str())
    }
}

/// Project a stored resource, dropping soft-deleted entities and every field
/// version other than the baseline.
pub fn project(resource: &Resource) -> ResourceSnapshot {
    ResourceSnapshot {
        id: resource.id.clone(),
        name: resource.name.clone(),
        project: resource.project.clone(),
        entities: resource
            .entities
            .iter()
            .filter(|e| !e.is_deleted())
            .map(project_entity)
            .collect(),
    }
}

fn project_entity(entity: &Entity) -> EntitySnapshot {
    let fields = entity
        .baseline()
        .map(|version| {
            version
                .fields
                .iter()
                .map(|f| FieldSnapshot {
                    name: f.name.clone(),
                    display_name: f.display_name.clone(),
                    data_type: f.data_type,
                    properties: f.properties.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    EntitySnapshot {
        id: entity.id.clone(),
        name: entity.name.clone(),
        display_name: entity.display_name.clone(),
        fields,
    }
}

/// Read a resource from the store and take a fresh snapshot of it.
pub async fn take_snapshot(store: &dyn SchemaStore, resource_id: &str) -> Result<ResourceSnapshot> {
    let resource = store
        .get_resource(resource_id)
        .await?
        .ok_or_else(|| RedesignError::NotFound {
            resource_id: resource_id.to_string(),
        })?;
    let snapshot = project(&resource);
    tracing::debug!(
        resource_id,
        entities = snapshot.entities.len(),
        "resource snapshot taken"
    );
    Ok(snapshot)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use redesign_core::{EntityField, EntityVersion};

    pub(crate) fn field(name: &str, data_type: DataType) -> EntityField {
        EntityField {
            name: name.to_string(),
            display_name: name.to_string(),
            data_type,
            properties: Default::default(),
        }
    }

    pub(crate) fn lookup(name: &str, related: &str) -> EntityField {
        let mut f = field(name, DataType::Lookup);
        f.properties.insert(
            redesign_core::RELATED_ENTITY_ID.to_string(),
            serde_json::Value::String(related.to_string()),
        );
        f
    }

    pub(crate) fn entity(id: &str, name: &str, fields: Vec<EntityField>) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            deleted_at: None,
            versions: vec![EntityVersion {
                version_number: 0,
                fields,
            }],
        }
    }

    pub(crate) fn resource(entities: Vec<Entity>) -> Resource {
        Resource {
            id: "res-1".to_string(),
            name: "Monolith".to_string(),
            project: Some(Project {
                id: "proj-1".to_string(),
                name: "Shop".to_string(),
            }),
            entities,
        }
    }

    #[test]
    fn deleted_entities_are_left_out() {
        let mut gone = entity("e2", "Legacy", vec![]);
        gone.deleted_at = Some("2024-02-02T00:00:00Z".into());
        let snap = project(&resource(vec![entity("e1", "Order", vec![]), gone]));

        let names: Vec<&str> = snap.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Order"]);
        assert_eq!(snap.project_id(), Some("proj-1"));
    }

    #[test]
    fn only_baseline_fields_are_kept() {
        let mut order = entity("e1", "Order", vec![field("total", DataType::DecimalNumber)]);
        order.versions.push(EntityVersion {
            version_number: 1,
            fields: vec![field("published", DataType::Boolean)],
        });
        // Published versions listed first must not win over the baseline.
        order.versions.reverse();

        let snap = project(&resource(vec![order]));
        let fields: Vec<&str> = snap.entities[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["total"]);
    }

    #[test]
    fn entity_without_baseline_has_no_fields() {
        let mut order = entity("e1", "Order", vec![]);
        order.versions.clear();
        let snap = project(&resource(vec![order]));
        assert!(snap.entities[0].fields.is_empty());
    }

    #[test]
    fn entity_order_is_preserved() {
        let snap = project(&resource(vec![
            entity("e3", "Zeta", vec![]),
            entity("e1", "Alpha", vec![]),
        ]));
        assert_eq!(snap.entities[0].id, "e3");
        assert_eq!(snap.entities[1].id, "e1");
    }
}
