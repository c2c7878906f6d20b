//! Conjunctive RDF graph: one named graph (context) per harvested source.
//!
//! [`GraphStore`] is the single source of truth for every pipeline stage. It
//! is opened once per run and handed to each stage by reference; nothing in
//! the crate keeps a process-wide store.
//!
//! Identifiers are oxigraph terms. Subjects are [`Resource`]s (IRIs or blank
//! nodes); objects are [`Term`]s and may also be literals.

pub mod store;

use oxigraph::model::{
    BlankNode, GraphNameRef, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Term,
};

pub use store::GraphStore;

/// Anything that can appear in subject position.
pub type Resource = NamedOrBlankNode;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, crate::error::StoreError>;

/// Which part of the conjunctive graph an operation looks at.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Every context at once.
    Union,
    /// A single context.
    Context(NamedNodeRef<'a>),
}

impl<'a> Scope<'a> {
    pub(crate) fn graph_name(self) -> Option<GraphNameRef<'a>> {
        match self {
            Scope::Union => None,
            Scope::Context(ctx) => Some(GraphNameRef::NamedNode(ctx)),
        }
    }
}

/// Resource view of a term, if it is an IRI or blank node.
pub fn as_resource(term: &Term) -> Option<Resource> {
    match term {
        Term::NamedNode(n) => Some(NamedOrBlankNode::NamedNode(n.clone())),
        Term::BlankNode(b) => Some(NamedOrBlankNode::BlankNode(b.clone())),
        _ => None,
    }
}

/// Literal view of a term.
pub fn as_literal(term: &Term) -> Option<&Literal> {
    match term {
        Term::Literal(l) => Some(l),
        _ => None,
    }
}

/// Resource for a named node reference.
pub fn named(node: NamedNodeRef<'_>) -> Resource {
    NamedOrBlankNode::NamedNode(node.into_owned())
}

/// Resource for an IRI string that is known to be absolute.
pub fn iri(iri: &str) -> StoreResult<Resource> {
    Ok(NamedOrBlankNode::NamedNode(named_node(iri)?))
}

/// Validated named node.
pub fn named_node(iri: &str) -> StoreResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| crate::error::StoreError::InvalidIri {
        iri: iri.to_string(),
        message: e.to_string(),
    })
}

/// Fresh blank node.
pub fn blank() -> Resource {
    NamedOrBlankNode::BlankNode(BlankNode::default())
}

/// Plain string literal.
pub fn literal(value: impl Into<String>) -> Term {
    Term::Literal(Literal::new_simple_literal(value))
}

/// Term in object position for a resource.
pub fn term(resource: &Resource) -> Term {
    match resource {
        NamedOrBlankNode::NamedNode(n) => Term::NamedNode(n.clone()),
        NamedOrBlankNode::BlankNode(b) => Term::BlankNode(b.clone()),
    }
}

/// Term in object position for a vocabulary node.
pub fn term_of(node: NamedNodeRef<'_>) -> Term {
    Term::NamedNode(node.into_owned())
}

/// IRI string, or blank-node id without the `_:` prefix.
pub fn resource_str(resource: &Resource) -> &str {
    match resource {
        NamedOrBlankNode::NamedNode(n) => n.as_str(),
        NamedOrBlankNode::BlankNode(b) => b.as_str(),
    }
}

/// Whether a resource is a blank node.
pub fn is_blank(resource: &Resource) -> bool {
    matches!(resource, NamedOrBlankNode::BlankNode(_))
}

/// Sort resources by their string form so iteration order is stable.
pub fn sort_resources(resources: &mut [Resource]) {
    resources.sort_by(|a, b| resource_str(a).cmp(resource_str(b)));
}
