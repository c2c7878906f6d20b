//! Weighted network projected from the RDF graph.
//!
//! Nodes are resources keyed by an ASCII-only identifier; edges are directed,
//! labelled by predicate local name and weighted by how strong a connection
//! the predicate implies. Parallel edges are kept, so the network is a
//! directed multigraph.

pub mod ego;
pub mod gexf;
pub mod project;

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::ProjectError;

pub use ego::{ego_graph, min_degree};
pub use gexf::{write_gexf, write_gexf_file};
pub use project::Projector;

/// Result type for projection operations.
pub type ProjectResult<T> = std::result::Result<T, ProjectError>;

/// Weight of an edge whose predicate is not in [`CONNECTION_WEIGHTS`].
pub const DEFAULT_WEIGHT: u32 = 1;

/// Edge weight by predicate local name.
pub const CONNECTION_WEIGHTS: &[(&str, u32)] = &[
    ("sameAs", 10),
    ("spouse", 9),
    ("founder", 7),
    ("founderOf", 7),
    ("colleague", 4),
    ("member", 5),
    ("memberOf", 5),
    ("knows", 2),
    ("correspondedWith", 2),
    ("publisher", 3),
    ("association", 1),
    ("affiliation", 1),
    ("worksFor", 4),
    ("mentions", 1),
    ("alumniOf", 3),
    ("about", 6),
    ("creator", 7),
    ("author", 7),
    ("contributor", 6),
    ("relatedLink", 4),
    ("title", 3),
    ("hasPart", 5),
    ("birthPlace", 5),
    ("workLocation", 4),
    ("location", 4),
    ("homeLocation", 4),
];

/// Weight for an edge labelled `label`.
pub fn weight_for(label: &str) -> u32 {
    CONNECTION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(DEFAULT_WEIGHT, |(_, weight)| *weight)
}

/// A network node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: String,
    pub label: Option<String>,
    /// Literal properties keyed by predicate local name, plus `type`.
    pub attributes: BTreeMap<String, String>,
}

impl NodeData {
    /// The node's type attribute, if it has one.
    pub fn node_type(&self) -> Option<&str> {
        self.attributes.get("type").map(String::as_str)
    }
}

/// A labelled, weighted edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub label: String,
    pub weight: u32,
}

/// Directed multigraph with O(1) node lookup by id.
#[derive(Debug, Clone, Default)]
pub struct Network {
    graph: DiGraph<NodeData, EdgeData>,
    index: HashMap<String, NodeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a node exists for `id`, returning its index.
    pub fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(id) {
            return *idx;
        }
        let idx = self.graph.add_node(NodeData {
            id: id.to_string(),
            label: None,
            attributes: BTreeMap::new(),
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeData> {
        let idx = self.index_of(id)?;
        Some(&mut self.graph[idx])
    }

    /// Add a directed edge, weighted by its label. Both nodes must exist.
    pub fn add_edge(&mut self, source: &str, target: &str, label: &str) -> ProjectResult<()> {
        let weight = weight_for(label);
        self.add_weighted_edge(source, target, label, weight)
    }

    pub fn add_weighted_edge(
        &mut self,
        source: &str,
        target: &str,
        label: &str,
        weight: u32,
    ) -> ProjectResult<()> {
        let from = self.require(source)?;
        let to = self.require(target)?;
        self.graph.add_edge(
            from,
            to,
            EdgeData {
                label: label.to_string(),
                weight,
            },
        );
        Ok(())
    }

    fn require(&self, id: &str) -> ProjectResult<NodeIndex> {
        self.index_of(id).ok_or_else(|| ProjectError::NodeNotFound {
            node: id.to_string(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    /// Every edge as `(source id, target id, data)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                e.weight(),
            )
        })
    }

    /// Edges between two nodes in either direction.
    pub fn edges_between(&self, a: &str, b: &str) -> Vec<&EdgeData> {
        let (Some(a), Some(b)) = (self.index_of(a), self.index_of(b)) else {
            return Vec::new();
        };
        self.graph
            .edges_connecting(a, b)
            .chain(self.graph.edges_connecting(b, a))
            .map(|e| e.weight())
            .collect()
    }

    /// Neighbours ignoring edge direction, without duplicates.
    pub fn neighbors_undirected(&self, id: &str) -> Vec<&str> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.graph
            .neighbors_undirected(idx)
            .filter(|n| seen.insert(*n))
            .map(|n| self.graph[n].id.as_str())
            .collect()
    }

    /// In-degree plus out-degree, counting parallel edges.
    pub fn degree(&self, id: &str) -> usize {
        self.index_of(id).map_or(0, |idx| {
            self.graph.edges_directed(idx, Direction::Outgoing).count()
                + self.graph.edges_directed(idx, Direction::Incoming).count()
        })
    }

    /// Induced subnetwork over the given node ids, keeping every edge
    /// between retained nodes.
    pub fn subgraph(&self, keep: &HashSet<&str>) -> Network {
        let mut sub = Network::new();
        for node in self.nodes().filter(|n| keep.contains(n.id.as_str())) {
            let idx = sub.ensure_node(&node.id);
            sub.graph[idx] = node.clone();
        }
        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()].id;
            let target = &self.graph[edge.target()].id;
            if let (Some(from), Some(to)) = (sub.index_of(source), sub.index_of(target)) {
                sub.graph.add_edge(from, to, edge.weight().clone());
            }
        }
        sub
    }
}
