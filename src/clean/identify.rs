//! Group-sheet identification.
//!
//! Some collections mix Group sheets with other manuscripts, so a context is
//! first searched for manuscripts that mention the Group directly and have an
//! author. Finding-aid RDF only says that the page is about the Group and
//! about a collection that mentions manuscripts, which is the fallback.

use oxigraph::model::NamedNodeRef;

use crate::graph::{GraphStore, Resource, StoreResult, term_of};
use crate::vocab::{BELFAST_GROUP_URI, bg, rdf, sparql_prefixes};

/// Labels Group sheets with the local Group-sheet type.
pub struct Identifier<'a> {
    store: &'a GraphStore,
}

impl<'a> Identifier<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Process every context. Returns the number of Group sheets labelled.
    pub fn run(&self) -> StoreResult<usize> {
        let mut total = 0;
        for ctx in self.store.contexts()? {
            total += self.process_context(ctx.as_ref())?;
        }
        tracing::info!(groupsheets = total, "identified Group sheets");
        Ok(total)
    }

    /// Label the Group sheets of one context. A context with none is left untouched.
    pub fn process_context(&self, ctx: NamedNodeRef<'_>) -> StoreResult<usize> {
        let mut found = self.direct_mentions(ctx)?;
        if found.is_empty() {
            found = self.collection_mentions(ctx)?;
        }
        if found.is_empty() {
            tracing::debug!(context = ctx.as_str(), "no Group sheets");
            return Ok(0);
        }

        tracing::debug!(context = ctx.as_str(), count = found.len(), "found Group sheets");
        for ms in &found {
            self.store.insert(ctx, ms, rdf::TYPE, &term_of(bg::GROUP_SHEET))?;
        }
        Ok(found.len())
    }

    fn direct_mentions(&self, ctx: NamedNodeRef<'_>) -> StoreResult<Vec<Resource>> {
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?ms WHERE {{
                GRAPH <{ctx}> {{
                    ?ms rdf:type bibo:Manuscript .
                    ?ms schema:mentions <{group}> .
                    ?ms dc:creator ?auth
                }}
            }}",
            prefixes = sparql_prefixes(),
            ctx = ctx.as_str(),
            group = BELFAST_GROUP_URI,
        );
        self.store.select_resources(&query, "ms")
    }

    fn collection_mentions(&self, ctx: NamedNodeRef<'_>) -> StoreResult<Vec<Resource>> {
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?ms WHERE {{
                GRAPH <{ctx}> {{
                    ?doc schema:about <{group}> .
                    ?doc schema:about ?coll .
                    ?coll schema:mentions ?ms .
                    ?ms rdf:type bibo:Manuscript
                }}
            }}",
            prefixes = sparql_prefixes(),
            ctx = ctx.as_str(),
            group = BELFAST_GROUP_URI,
        );
        self.store.select_resources(&query, "ms")
    }
}
