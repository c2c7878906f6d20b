//! Read-side view of a person, organization or place in the prepared data.
//!
//! An [`RdfEntity`] is only an identifier; everything else is looked up on
//! demand from the store or the projected network passed in by the caller.

use std::collections::{BTreeMap, BTreeSet};

use oxigraph::model::{NamedNodeRef, Term};

use crate::graph::{GraphStore, Resource, Scope, StoreResult, iri, resource_str, term_of};
use crate::network::project::node_id;
use crate::network::{Network, ProjectResult};
use crate::vocab::{owl, rdf, schema, skos};

/// Connected entities by node id, each with the labels of the edges linking
/// it to the entity.
pub type Connections = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdfEntity {
    pub id: Resource,
}

impl RdfEntity {
    pub fn new(id: Resource) -> Self {
        Self { id }
    }

    /// Node id of this entity in a projected network.
    pub fn node_id(&self) -> String {
        node_id(&self.id)
    }

    /// The VIAF URI when the entity is itself identified by one.
    pub fn viaf_uri(&self) -> Option<&str> {
        let id = resource_str(&self.id);
        id.contains("viaf.org").then_some(id)
    }
}

/// Display name: preferred label, else `schema:name`.
pub fn name(entity: &RdfEntity, store: &GraphStore) -> StoreResult<Option<String>> {
    for predicate in [skos::PREF_LABEL, schema::NAME] {
        if let Some(name) = store.literal(Scope::Union, &entity.id, predicate)? {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// First DBpedia resource the entity is `owl:sameAs`.
pub fn dbpedia_uri(entity: &RdfEntity, store: &GraphStore) -> StoreResult<Option<String>> {
    Ok(store
        .objects(Scope::Union, &entity.id, owl::SAME_AS)?
        .into_iter()
        .find_map(|t| match t {
            Term::NamedNode(n) if n.as_str().contains("dbpedia.org") => Some(n.into_string()),
            _ => None,
        }))
}

/// Undirected neighbourhood of the entity, see [`crate::network::ego_graph`].
pub fn ego_graph(
    entity: &RdfEntity,
    network: &Network,
    radius: usize,
    types: Option<&[&str]>,
) -> ProjectResult<Network> {
    crate::network::ego_graph(network, &entity.node_id(), radius, types)
}

/// Direct neighbours typed `schema:Person`.
pub fn connected_people(
    entity: &RdfEntity,
    store: &GraphStore,
    network: &Network,
) -> ProjectResult<Connections> {
    connections(entity, store, network, Some(schema::PERSON))
}

/// Direct neighbours typed `schema:Organization`.
pub fn connected_organizations(
    entity: &RdfEntity,
    store: &GraphStore,
    network: &Network,
) -> ProjectResult<Connections> {
    connections(entity, store, network, Some(schema::ORGANIZATION))
}

/// Direct neighbours in either direction, optionally restricted to those
/// whose `rdf:type` in the store is `class`. An entity missing from the
/// network has no connections.
pub fn connections(
    entity: &RdfEntity,
    store: &GraphStore,
    network: &Network,
    class: Option<NamedNodeRef<'_>>,
) -> ProjectResult<Connections> {
    let me = entity.node_id();
    if !network.contains(&me) {
        return Ok(Connections::new());
    }
    let class = class.map(term_of);

    let mut found = Connections::new();
    for neighbor in network.neighbors_undirected(&me) {
        if neighbor == me {
            continue;
        }
        if let Some(class) = &class {
            // Blank-node ids are not IRIs and so never match a type.
            let Ok(resource) = iri(neighbor) else {
                continue;
            };
            if !store.contains(Scope::Union, &resource, rdf::TYPE, class)? {
                continue;
            }
        }
        let labels = network
            .edges_between(&me, neighbor)
            .into_iter()
            .map(|e| e.label.clone())
            .collect();
        found.insert(neighbor.to_string(), labels);
    }
    tracing::debug!(entity = %me, connections = found.len(), "found connections");
    Ok(found)
}
