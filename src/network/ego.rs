//! Ego networks and degree filtering.

use std::collections::{HashSet, VecDeque};

use crate::error::ProjectError;

use super::{Network, ProjectResult};

/// Neighbourhood of `center` out to `radius` hops, ignoring edge direction.
///
/// When `types` is given, nodes whose `type` attribute is not listed are
/// dropped *before* expanding, so the result never reaches a node only
/// through a filtered-out intermediary. The center itself is always kept.
/// Edges in the result keep their original direction.
pub fn ego_graph(
    network: &Network,
    center: &str,
    radius: usize,
    types: Option<&[&str]>,
) -> ProjectResult<Network> {
    if !network.contains(center) {
        return Err(ProjectError::NodeNotFound {
            node: center.to_string(),
        });
    }
    let allowed = |id: &str| match types {
        None => true,
        Some(types) => network
            .node(id)
            .and_then(|n| n.node_type())
            .is_some_and(|t| types.contains(&t)),
    };

    let mut keep: HashSet<&str> = HashSet::from([center]);
    let mut queue = VecDeque::from([(center, 0usize)]);
    while let Some((id, depth)) = queue.pop_front() {
        if depth == radius {
            continue;
        }
        for neighbor in network.neighbors_undirected(id) {
            if allowed(neighbor) && keep.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    let ego = network.subgraph(&keep);
    tracing::debug!(
        center,
        radius,
        nodes = ego.node_count(),
        edges = ego.edge_count(),
        "built ego network"
    );
    Ok(ego)
}

/// Drop every node with fewer than `min` connections. Degrees are measured
/// once, on the network as given.
pub fn min_degree(network: &Network, min: usize) -> Network {
    if min == 0 {
        return network.clone();
    }
    let keep: HashSet<&str> = network
        .nodes()
        .map(|n| n.id.as_str())
        .filter(|id| network.degree(id) >= min)
        .collect();
    let removed = network.node_count() - keep.len();
    if removed > 0 {
        tracing::info!(removed, min_degree = min, "removed low-degree nodes");
    }
    network.subgraph(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// group <- a -> b -> c, a -> place, d isolated.
    fn sample() -> Network {
        let mut net = Network::new();
        for (id, ty) in [
            ("group", "Organization"),
            ("a", "Person"),
            ("b", "Person"),
            ("c", "Person"),
            ("place", "Place"),
            ("d", "Person"),
        ] {
            net.ensure_node(id);
            net.node_mut(id).unwrap().attributes.insert("type".into(), ty.into());
        }
        net.add_edge("a", "group", "memberOf").unwrap();
        net.add_edge("a", "b", "knows").unwrap();
        net.add_edge("b", "c", "knows").unwrap();
        net.add_edge("a", "place", "homeLocation").unwrap();
        net.add_edge("place", "c", "mentions").unwrap();
        net
    }

    fn ids(net: &Network) -> Vec<&str> {
        let mut ids: Vec<&str> = net.nodes().map(|n| n.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn radius_follows_edges_both_ways() {
        let net = sample();
        let one = ego_graph(&net, "group", 1, None).unwrap();
        assert_eq!(ids(&one), vec!["a", "group"]);
        assert_eq!(one.edge_count(), 1);

        let two = ego_graph(&net, "group", 2, None).unwrap();
        assert_eq!(ids(&two), vec!["a", "b", "group", "place"]);
    }

    #[test]
    fn type_filter_applies_before_expansion() {
        let net = sample();
        let people = ego_graph(&net, "a", 2, Some(&["Person", "Organization"])).unwrap();
        // c is reachable through b, not only through the filtered place.
        assert_eq!(ids(&people), vec!["a", "b", "c", "group"]);

        let direct = ego_graph(&net, "place", 1, Some(&["Organization"])).unwrap();
        assert_eq!(ids(&direct), vec!["place"]);
    }

    #[test]
    fn missing_center_is_an_error() {
        let err = ego_graph(&sample(), "nobody", 1, None).unwrap_err();
        assert!(matches!(err, ProjectError::NodeNotFound { .. }));
    }

    #[test]
    fn degree_filter_drops_isolated_nodes() {
        let net = sample();
        let filtered = min_degree(&net, 1);
        assert!(!filtered.contains("d"));
        assert_eq!(filtered.node_count(), 5);

        let core = min_degree(&net, 3);
        assert_eq!(ids(&core), vec!["a"]);
        assert_eq!(min_degree(&net, 0).node_count(), net.node_count());
    }
}
