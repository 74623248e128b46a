//! Turns an unchecked generator proposal into a decomposition that only
//! references entities of the resource, each assigned to exactly one service.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::parse::{RawMicroservice, RawRecommendationOutput};
use crate::snapshot::{EntitySnapshot, ResourceSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedDataModel {
    pub name: String,
    pub original_entity_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedMicroservice {
    pub name: String,
    pub functionality: String,
    pub data_models: Vec<ProposedDataModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DecompositionProposal {
    pub microservices: Vec<ProposedMicroservice>,
}

/// Names that occur more than once across the given list (case-sensitive).
pub fn find_duplicated_entities<'a>(names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| !seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Reconcile a decoded proposal against a snapshot of the resource.
///
/// Services are visited largest-first (stable on ties). A duplicated entity
/// stays with the first service visited that lists it; names unknown to the
/// snapshot are dropped everywhere. Services left without entities are removed.
pub fn reconcile(
    output: RawRecommendationOutput,
    ground_truth: &ResourceSnapshot,
) -> DecompositionProposal {
    let duplicated = find_duplicated_entities(
        output
            .microservices
            .iter()
            .flat_map(|m| m.data_models.iter().map(String::as_str)),
    );
    let entities_by_name: HashMap<&str, &EntitySnapshot> = ground_truth
        .entities
        .iter()
        .map(|e| (e.name.as_str(), e))
        .collect();

    let mut ordered = output.microservices;
    ordered.sort_by_key(|m| Reverse(m.data_models.len()));

    let (_claimed, microservices) = ordered.into_iter().fold(
        (HashSet::<String>::new(), Vec::new()),
        |(claimed, mut kept), microservice| {
            let (claimed, service) =
                assign_entities(microservice, claimed, &duplicated, &entities_by_name);
            if service.data_models.is_empty() {
                tracing::debug!(microservice = %service.name, "dropping microservice with no entities left");
            } else {
                kept.push(service);
            }
            (claimed, kept)
        },
    );

    DecompositionProposal { microservices }
}

fn assign_entities(
    microservice: RawMicroservice,
    mut claimed: HashSet<String>,
    duplicated: &HashSet<String>,
    entities_by_name: &HashMap<&str, &EntitySnapshot>,
) -> (HashSet<String>, ProposedMicroservice) {
    let mut data_models = Vec::with_capacity(microservice.data_models.len());

    for name in microservice.data_models {
        let already_claimed = claimed.contains(&name);
        if duplicated.contains(&name) {
            claimed.insert(name.clone());
        }

        let Some(entity) = entities_by_name.get(name.as_str()) else {
            tracing::warn!(
                microservice = %microservice.name,
                entity = %name,
                "proposed entity does not exist in resource"
            );
            continue;
        };
        if already_claimed {
            tracing::debug!(
                microservice = %microservice.name,
                entity = %name,
                "entity already assigned to an earlier microservice"
            );
            continue;
        }

        data_models.push(ProposedDataModel {
            name,
            original_entity_id: entity.id.clone(),
        });
    }

    (
        claimed,
        ProposedMicroservice {
            name: microservice.name,
            functionality: microservice.functionality,
            data_models,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_recommendation;

    fn snapshot(names: &[&str]) -> ResourceSnapshot {
        ResourceSnapshot {
            id: "res-1".into(),
            name: "Monolith".into(),
            project: None,
            entities: names
                .iter()
                .map(|n| EntitySnapshot {
                    id: format!("id-{}", n.to_lowercase()),
                    name: n.to_string(),
                    display_name: n.to_string(),
                    fields: vec![],
                })
                .collect(),
        }
    }

    fn service(name: &str, models: &[&str]) -> RawMicroservice {
        RawMicroservice {
            name: name.into(),
            functionality: String::new(),
            data_models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn names(service: &ProposedMicroservice) -> Vec<&str> {
        service.data_models.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn duplicates_are_detected_across_services() {
        let dups = find_duplicated_entities(["x", "y", "y", "z", "x", "X"]);
        assert_eq!(dups.len(), 2);
        assert!(dups.contains("x") && dups.contains("y"));
        assert!(!dups.contains("X"));
    }

    #[test]
    fn duplicate_goes_to_first_service_on_tie() {
        let output = RawRecommendationOutput {
            microservices: vec![service("A", &["x", "y"]), service("B", &["y", "z"])],
        };
        let proposal = reconcile(output, &snapshot(&["x", "y", "z"]));

        assert_eq!(proposal.microservices.len(), 2);
        assert_eq!(names(&proposal.microservices[0]), vec!["x", "y"]);
        assert_eq!(names(&proposal.microservices[1]), vec!["z"]);
    }

    #[test]
    fn unknown_entities_are_dropped() {
        let output = RawRecommendationOutput {
            microservices: vec![service("A", &["x", "w"])],
        };
        let proposal = reconcile(output, &snapshot(&["x", "y"]));
        assert_eq!(names(&proposal.microservices[0]), vec!["x"]);
    }

    #[test]
    fn emptied_services_are_removed() {
        let output = RawRecommendationOutput {
            microservices: vec![
                service("Big", &["x", "y", "z"]),
                service("Ghost", &["nope", "missing"]),
                service("Leftover", &["y"]),
            ],
        };
        let proposal = reconcile(output, &snapshot(&["x", "y", "z"]));

        let services: Vec<&str> = proposal.microservices.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(services, vec!["Big"]);
    }

    #[test]
    fn larger_services_claim_first() {
        let output = RawRecommendationOutput {
            microservices: vec![service("Small", &["y"]), service("Large", &["x", "y", "z"])],
        };
        let proposal = reconcile(output, &snapshot(&["x", "y", "z"]));

        assert_eq!(proposal.microservices.len(), 1);
        assert_eq!(proposal.microservices[0].name, "Large");
    }

    #[test]
    fn size_counts_raw_proposed_entities() {
        // "Noisy" lists three names but only one is real; it still sorts first.
        let output = RawRecommendationOutput {
            microservices: vec![
                service("Clean", &["x", "y"]),
                service("Noisy", &["a", "b", "y"]),
            ],
        };
        let proposal = reconcile(output, &snapshot(&["x", "y"]));

        assert_eq!(proposal.microservices[0].name, "Noisy");
        assert_eq!(names(&proposal.microservices[0]), vec!["y"]);
        assert_eq!(names(&proposal.microservices[1]), vec!["x"]);
    }

    #[test]
    fn repeated_name_inside_one_service_is_kept_once() {
        let output = RawRecommendationOutput {
            microservices: vec![service("A", &["x", "x"])],
        };
        let proposal = reconcile(output, &snapshot(&["x"]));
        assert_eq!(names(&proposal.microservices[0]), vec!["x"]);
    }

    #[test]
    fn every_entity_carries_its_original_id() {
        let output = RawRecommendationOutput {
            microservices: vec![service("A", &["Order", "Customer"]), service("B", &["Invoice"])],
        };
        let truth = snapshot(&["Order", "Customer", "Invoice"]);
        let proposal = reconcile(output, &truth);

        for model in proposal.microservices.iter().flat_map(|m| &m.data_models) {
            let original = truth.entities.iter().find(|e| e.name == model.name).unwrap();
            assert_eq!(model.original_entity_id, original.id);
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        let output = RawRecommendationOutput {
            microservices: vec![service("A", &["order"])],
        };
        let proposal = reconcile(output, &snapshot(&["Order"]));
        assert!(proposal.microservices.is_empty());
    }

    #[test]
    fn sales_and_orgs_scenario() {
        let raw = r#"{"microservices": [
            {"name": "Sales", "functionality": "", "dataModels": ["Order", "Customer"]},
            {"name": "Orgs", "functionality": "", "dataModels": ["Customer", "Organization"]}
        ]}"#;
        let truth = snapshot(&["Customer", "Order", "Organization"]);
        let proposal = reconcile(parse_recommendation(raw).unwrap(), &truth);

        assert_eq!(proposal.microservices.len(), 2);
        assert_eq!(proposal.microservices[0].name, "Sales");
        assert_eq!(names(&proposal.microservices[0]), vec!["Order", "Customer"]);
        assert_eq!(proposal.microservices[1].name, "Orgs");
        assert_eq!(names(&proposal.microservices[1]), vec!["Organization"]);
        assert_eq!(
            proposal.microservices[1].data_models[0].original_entity_id,
            "id-organization"
        );
    }

    #[test]
    fn proposal_serializes_camel_case() {
        let proposal = DecompositionProposal {
            microservices: vec![ProposedMicroservice {
                name: "A".into(),
                functionality: "f".into(),
                data_models: vec![ProposedDataModel {
                    name: "x".into(),
                    original_entity_id: "id-x".into(),
                }],
            }],
        };
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["microservices"][0]["dataModels"][0]["originalEntityId"], "id-x");
    }
}
