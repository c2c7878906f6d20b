//! Projection of the RDF graph onto a [`Network`].
//!
//! Every resource becomes a node, every resource-valued triple an edge, and
//! every literal-valued triple an attribute of its subject. RDF list cells are
//! skipped: a list-valued title is rendered into the sheet's label instead.

use oxigraph::model::Term;

use crate::graph::{GraphStore, Resource, Scope, StoreResult, as_resource, is_blank, resource_str};
use crate::text::{ascii_only, local_name, normalize_whitespace};
use crate::vocab::{dc, rdf, schema, skos};

use super::{Network, ProjectResult};

/// Longest list-title label before it is cut short.
const MAX_LIST_LABEL: usize = 50;

/// Type given to manuscripts whose title is an RDF list.
pub const GROUP_SHEET_TYPE: &str = "BelfastGroupSheet";

/// Network node id for a resource. GEXF readers choke on some non-ASCII
/// characters, so they are folded or dropped.
pub fn node_id(resource: &Resource) -> String {
    ascii_only(resource_str(resource))
}

pub struct Projector<'a> {
    store: &'a GraphStore,
}

impl<'a> Projector<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Build the network from every triple in every context.
    pub fn project(&self) -> ProjectResult<Network> {
        let mut network = Network::new();
        for ctx in self.store.contexts()? {
            let scope = Scope::Context(ctx.as_ref());
            for quad in self.store.quads(scope, None, None, None)? {
                if quad.predicate == rdf::FIRST || quad.predicate == rdf::REST {
                    continue;
                }
                let subject = self.add_node(&mut network, &quad.subject)?;
                let name = local_name(quad.predicate.as_str());

                if quad.predicate == rdf::TYPE {
                    let mut value = match &quad.object {
                        Term::NamedNode(n) => local_name(n.as_str()).to_string(),
                        Term::Literal(l) => normalize_whitespace(l.value()),
                        _ => continue,
                    };
                    if value == "Manuscript" && self.has_list_title(scope, &quad.subject)? {
                        value = GROUP_SHEET_TYPE.to_string();
                    }
                    if let Some(node) = network.node_mut(&subject) {
                        // A sheet keeps its group-sheet type whatever else it is typed as.
                        if node.node_type() != Some(GROUP_SHEET_TYPE) {
                            node.attributes.insert("type".into(), value);
                        }
                    }
                    continue;
                }

                match &quad.object {
                    Term::Literal(l) => {
                        if let Some(node) = network.node_mut(&subject) {
                            node.attributes
                                .insert(name.to_string(), normalize_whitespace(l.value()));
                        }
                    }
                    object => {
                        let Some(object) = as_resource(object) else {
                            continue;
                        };
                        if quad.predicate == dc::TITLE && is_blank(&object) {
                            continue;
                        }
                        let target = self.add_node(&mut network, &object)?;
                        network.add_edge(&subject, &target, name)?;
                    }
                }
            }
        }
        tracing::info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            "projected RDF network"
        );
        Ok(network)
    }

    fn add_node(&self, network: &mut Network, resource: &Resource) -> StoreResult<String> {
        let id = node_id(resource);
        if !network.contains(&id) {
            let label = self.node_label(resource)?;
            network.ensure_node(&id);
            if let Some(node) = network.node_mut(&id) {
                node.label = label;
            }
        }
        Ok(id)
    }

    fn has_list_title(&self, scope: Scope<'_>, subject: &Resource) -> StoreResult<bool> {
        match self.store.value(scope, subject, dc::TITLE)?.as_ref().and_then(as_resource) {
            Some(title) => self.store.is_list(Scope::Union, &title),
            None => Ok(false),
        }
    }

    /// Preferred label, name, title, then the type's local name.
    pub fn node_label(&self, resource: &Resource) -> StoreResult<Option<String>> {
        for predicate in [skos::PREF_LABEL, schema::NAME] {
            if let Some(label) = self.store.literal(Scope::Union, resource, predicate)? {
                return Ok(Some(normalize_whitespace(&label)));
            }
        }

        match self.store.value(Scope::Union, resource, dc::TITLE)? {
            Some(Term::Literal(title)) => return Ok(Some(normalize_whitespace(title.value()))),
            Some(title) => {
                if let Some(head) = as_resource(&title) {
                    let items: Vec<String> = self
                        .store
                        .resource_list(Scope::Union, &head)?
                        .iter()
                        .filter_map(|t| match t {
                            Term::Literal(l) => Some(normalize_whitespace(l.value())),
                            _ => None,
                        })
                        .collect();
                    if !items.is_empty() {
                        return Ok(Some(list_label(&items)));
                    }
                }
            }
            None => {}
        }

        Ok(self
            .store
            .value(Scope::Union, resource, rdf::TYPE)?
            .and_then(|t| match t {
                Term::NamedNode(n) => Some(local_name(n.as_str()).to_string()),
                _ => None,
            }))
    }
}

/// `group sheet: a; b; c`, cut to [`MAX_LIST_LABEL`] characters plus ` ...`.
fn list_label(titles: &[String]) -> String {
    let label = format!("group sheet: {}", titles.join("; "));
    if label.chars().count() > MAX_LIST_LABEL {
        let truncated: String = label.chars().take(MAX_LIST_LABEL).collect();
        format!("{truncated} ...")
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::NamedNodeRef;

    use crate::graph::{blank, iri, literal, term, term_of};
    use crate::vocab::{bibo, foaf, owl};

    const CTX: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://example.org/ctx/");

    fn person(store: &GraphStore, uri: &str, name: &str) -> Resource {
        let r = iri(uri).unwrap();
        store.insert(CTX, &r, rdf::TYPE, &term_of(schema::PERSON)).unwrap();
        store.insert(CTX, &r, schema::NAME, &literal(name)).unwrap();
        r
    }

    #[test]
    fn knows_weighs_two_and_unknown_predicates_one() {
        let store = GraphStore::in_memory().unwrap();
        let a = person(&store, "http://example.org/people/a/", "A");
        let b = person(&store, "http://example.org/people/b/", "B");
        store.insert(CTX, &a, foaf::KNOWS, &term(&b)).unwrap();
        let odd = oxigraph::model::NamedNode::new("http://example.org/ns#taughtAlongside").unwrap();
        store.insert(CTX, &a, odd.as_ref(), &term(&b)).unwrap();

        let net = Projector::new(&store).project().unwrap();
        let mut weights: Vec<(String, u32)> = net
            .edges_between("http://example.org/people/a/", "http://example.org/people/b/")
            .iter()
            .map(|e| (e.label.clone(), e.weight))
            .collect();
        weights.sort();
        assert_eq!(
            weights,
            vec![("knows".to_string(), 2), ("taughtAlongside".to_string(), 1)]
        );
    }

    #[test]
    fn literals_and_types_become_attributes() {
        let store = GraphStore::in_memory().unwrap();
        let a = person(&store, "http://example.org/people/a/", "Philip  Hobsbaum");
        store.insert(CTX, &a, schema::GIVEN_NAME, &literal("Philip")).unwrap();

        let net = Projector::new(&store).project().unwrap();
        let node = net.node("http://example.org/people/a/").unwrap();
        assert_eq!(node.label.as_deref(), Some("Philip Hobsbaum"));
        assert_eq!(node.node_type(), Some("Person"));
        assert_eq!(node.attributes.get("givenName").map(String::as_str), Some("Philip"));
        assert_eq!(net.edge_count(), 0);
    }

    #[test]
    fn list_titled_manuscript_is_a_group_sheet() {
        let store = GraphStore::in_memory().unwrap();
        let ms = iri("http://example.org/groupsheets/md5/abc/").unwrap();
        let titles = store
            .write_list(CTX, &[literal("The dress"), literal("The telegram"), literal("The daisy chain")])
            .unwrap();
        store.insert(CTX, &ms, rdf::TYPE, &term_of(bibo::MANUSCRIPT)).unwrap();
        store.insert(CTX, &ms, dc::TITLE, &term(&titles)).unwrap();

        let net = Projector::new(&store).project().unwrap();
        let node = net.node("http://example.org/groupsheets/md5/abc/").unwrap();
        assert_eq!(node.node_type(), Some(GROUP_SHEET_TYPE));
        assert_eq!(
            node.label.as_deref(),
            Some("group sheet: The dress; The telegram; The daisy ch ...")
        );
        // No list cells, no title edges.
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.edge_count(), 0);
    }

    #[test]
    fn label_preference_and_type_fallback() {
        let store = GraphStore::in_memory().unwrap();
        let a = person(&store, "http://example.org/people/a/", "Name");
        store.insert(CTX, &a, skos::PREF_LABEL, &literal("Preferred")).unwrap();
        let place = blank();
        store.insert(CTX, &place, rdf::TYPE, &term_of(schema::PLACE)).unwrap();
        store.insert(CTX, &a, schema::MENTIONS, &term(&place)).unwrap();

        let projector = Projector::new(&store);
        assert_eq!(projector.node_label(&a).unwrap().as_deref(), Some("Preferred"));
        assert_eq!(projector.node_label(&place).unwrap().as_deref(), Some("Place"));
    }

    #[test]
    fn node_ids_are_ascii() {
        let store = GraphStore::in_memory().unwrap();
        let a = person(&store, "http://example.org/people/a/", "A");
        let dbp = iri("http://dbpedia.org/resource/Seán_Ó_Ríordáin").unwrap();
        store.insert(CTX, &a, owl::SAME_AS, &term(&dbp)).unwrap();

        let net = Projector::new(&store).project().unwrap();
        assert!(net.contains("http://dbpedia.org/resource/Sean_O_Riordain"));
        let edges = net.edges_between("http://example.org/people/a/", "http://dbpedia.org/resource/Sean_O_Riordain");
        assert_eq!(edges[0].weight, 10);
    }

    #[test]
    fn list_label_truncation() {
        assert_eq!(list_label(&["a".into(), "b".into()]), "group sheet: a; b");
        let long = list_label(&["x".repeat(60)]);
        assert!(long.ends_with(" ..."));
        assert_eq!(long.chars().count(), MAX_LIST_LABEL + 4);
    }
}
