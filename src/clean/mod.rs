//! Cleaning and inference over the harvested graph.
//!
//! The stages run in a fixed order: [`identify`] labels Group sheets,
//! [`smush`] gives each one a content-derived identifier, [`profile`] mints
//! local URIs for the people involved, and [`infer`] adds the relations the
//! sources only imply.

pub mod identify;
pub mod infer;
pub mod profile;
pub mod smush;

use oxigraph::model::NamedNodeRef;

use crate::graph::{Resource, is_blank, resource_str};
use crate::vocab::{owl, schema};

pub use identify::Identifier;
pub use infer::{Inferencer, InferReport};
pub use profile::{PersonName, ProfileReport, ProfileUris, person_names};
pub use smush::{SmushReport, Smusher};

/// Predicates whose objects are never rewritten by an identifier merge: the
/// digitized-edition URL and identity links keep pointing at the source.
pub const EXEMPT_PREDICATES: [NamedNodeRef<'static>; 2] = [schema::URL, owl::SAME_AS];

/// SPARQL filter expression that keeps blank nodes and IRIs outside `local_base`.
/// A plain prefix test on the IRI string; `local_base` is not a pattern.
pub(crate) fn not_local_filter(var: &str, local_base: &str) -> String {
    format!("FILTER(isBlank(?{var}) || (isIRI(?{var}) && !STRSTARTS(STR(?{var}), \"{local_base}\")))")
}

/// Whether a resource is already a local identifier.
pub(crate) fn is_local(resource: &Resource, local_base: &str) -> bool {
    !is_blank(resource) && resource_str(resource).starts_with(local_base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{blank, iri};

    #[test]
    fn local_test_is_a_literal_prefix() {
        let filter = not_local_filter("person", "http://bg.example.org/");
        assert!(filter.contains("!STRSTARTS(STR(?person), \"http://bg.example.org/\")"));
        assert!(!filter.contains("REGEX"));

        let base = "http://bg.example.org/";
        assert!(is_local(&iri("http://bg.example.org/people/seamus-heaney/").unwrap(), base));
        assert!(!is_local(&iri("http://bgxexample.org/people/seamus-heaney/").unwrap(), base));
        assert!(!is_local(&blank(), base));
    }
}
