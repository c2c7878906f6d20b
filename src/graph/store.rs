//! Persistent conjunctive RDF graph backed by oxigraph.
//!
//! Provides durable storage of quads, typed accessors over single contexts or
//! the union of all contexts, and SPARQL SELECT.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{
    GraphName, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, Term, Triple,
};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::StoreError;
use crate::vocab::rdf;

use super::{Resource, Scope, StoreResult, as_literal, as_resource, blank, term, term_of};

/// One SPARQL solution: variable name to bound term.
pub type Row = BTreeMap<String, Term>;

fn storage(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage {
        message: e.to_string(),
    }
}

/// Conjunctive RDF graph: a set of named graphs, one per source document.
pub struct GraphStore {
    store: Store,
    path: Option<PathBuf>,
}

impl GraphStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Open {
            path: ":memory:".into(),
            message: e.to_string(),
        })?;
        Ok(Self { store, path: None })
    }

    /// Open or create a persistent store at the given directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Store::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "opened RDF store");
        Ok(Self {
            store,
            path: Some(path.to_path_buf()),
        })
    }

    /// Remove everything at `path` and open a fresh, empty store there.
    pub fn destroy_and_recreate(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            std::fs::remove_dir_all(path).map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
            tracing::info!(path = %path.display(), "removed existing RDF store");
        }
        Self::open(path)
    }

    /// Directory backing this store, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of quads across all contexts.
    pub fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(storage)
    }

    /// Whether the store holds no quads.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.store.is_empty().map_err(storage)
    }

    // -----------------------------------------------------------------------
    // Contexts
    // -----------------------------------------------------------------------

    /// Every named context, sorted by IRI.
    pub fn contexts(&self) -> StoreResult<Vec<NamedNode>> {
        let mut out = Vec::new();
        for graph in self.store.named_graphs() {
            if let NamedOrBlankNode::NamedNode(n) = graph.map_err(storage)? {
                out.push(n);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Number of quads in a single context.
    pub fn context_len(&self, ctx: NamedNodeRef<'_>) -> StoreResult<usize> {
        Ok(self.quads(Scope::Context(ctx), None, None, None)?.len())
    }

    /// Drop a context and all of its quads.
    pub fn remove_context(&self, ctx: NamedNodeRef<'_>) -> StoreResult<()> {
        self.store.remove_named_graph(ctx).map_err(storage)?;
        Ok(())
    }

    /// Contexts in which the exact triple is asserted.
    pub fn contexts_containing(
        &self,
        s: &Resource,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<Vec<NamedNode>> {
        let mut out: Vec<NamedNode> = self
            .quads(Scope::Union, Some(s), Some(p), Some(o))?
            .into_iter()
            .filter_map(|q| match q.graph_name {
                GraphName::NamedNode(n) => Some(n),
                _ => None,
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Quad-level access
    // -----------------------------------------------------------------------

    /// All quads matching a pattern within a scope.
    pub fn quads(
        &self,
        scope: Scope<'_>,
        s: Option<&Resource>,
        p: Option<NamedNodeRef<'_>>,
        o: Option<&Term>,
    ) -> StoreResult<Vec<Quad>> {
        self.store
            .quads_for_pattern(
                s.map(|s| s.as_ref()),
                p,
                o.map(|o| o.as_ref()),
                scope.graph_name(),
            )
            .map(|q| q.map_err(storage))
            .collect()
    }

    /// Whether the triple is asserted anywhere in the scope.
    pub fn contains(
        &self,
        scope: Scope<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<bool> {
        match self
            .store
            .quads_for_pattern(Some(s.as_ref()), Some(p), Some(o.as_ref()), scope.graph_name())
            .next()
        {
            Some(q) => q.map(|_| true).map_err(storage),
            None => Ok(false),
        }
    }

    /// Assert a triple in a context. Returns whether it was new.
    pub fn insert(
        &self,
        ctx: NamedNodeRef<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<bool> {
        let quad = Quad::new(
            s.clone(),
            p.into_owned(),
            o.clone(),
            GraphName::NamedNode(ctx.into_owned()),
        );
        self.insert_quad(&quad)
    }

    /// Insert an already-built quad.
    pub fn insert_quad(&self, quad: &Quad) -> StoreResult<bool> {
        self.store.insert(quad).map_err(storage)
    }

    /// Insert parsed triples into a context. Returns how many were new.
    pub fn insert_triples(
        &self,
        ctx: NamedNodeRef<'_>,
        triples: impl IntoIterator<Item = Triple>,
    ) -> StoreResult<usize> {
        let graph = GraphName::NamedNode(ctx.into_owned());
        let mut added = 0;
        for t in triples {
            if self.insert_quad(&t.in_graph(graph.clone()))? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Retract a triple from a context.
    pub fn remove(
        &self,
        ctx: NamedNodeRef<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<bool> {
        let quad = Quad::new(
            s.clone(),
            p.into_owned(),
            o.clone(),
            GraphName::NamedNode(ctx.into_owned()),
        );
        self.remove_quad(&quad)
    }

    /// Remove an already-built quad.
    pub fn remove_quad(&self, quad: &Quad) -> StoreResult<bool> {
        self.store.remove(quad).map_err(storage)
    }

    /// Replace every value of `s p` in the context with `o`.
    pub fn set(
        &self,
        ctx: NamedNodeRef<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<()> {
        for quad in self.quads(Scope::Context(ctx), Some(s), Some(p), None)? {
            if &quad.object != o {
                self.remove_quad(&quad)?;
            }
        }
        self.insert(ctx, s, p, o)?;
        Ok(())
    }

    /// Parse a serialized RDF document into a context.
    pub fn load(
        &self,
        ctx: NamedNodeRef<'_>,
        format: RdfFormat,
        base_iri: &str,
        data: &[u8],
    ) -> StoreResult<()> {
        let load_err = |message: String| StoreError::Load {
            context: ctx.as_str().to_string(),
            message,
        };
        let parser = RdfParser::from_format(format)
            .with_base_iri(base_iri)
            .map_err(|e| load_err(e.to_string()))?
            .with_default_graph(GraphName::NamedNode(ctx.into_owned()));
        self.store
            .load_from_reader(parser, data)
            .map_err(|e| load_err(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    /// Every object of `s p` in the scope, deduplicated across contexts.
    pub fn objects(
        &self,
        scope: Scope<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
    ) -> StoreResult<Vec<Term>> {
        let mut seen = HashSet::new();
        Ok(self
            .quads(scope, Some(s), Some(p), None)?
            .into_iter()
            .map(|q| q.object)
            .filter(|o| seen.insert(o.clone()))
            .collect())
    }

    /// Any one object of `s p`.
    pub fn value(
        &self,
        scope: Scope<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
    ) -> StoreResult<Option<Term>> {
        match self
            .store
            .quads_for_pattern(Some(s.as_ref()), Some(p), None, scope.graph_name())
            .next()
        {
            Some(q) => Ok(Some(q.map_err(storage)?.object)),
            None => Ok(None),
        }
    }

    /// Every subject with `p o` in the scope, deduplicated across contexts.
    pub fn subjects(
        &self,
        scope: Scope<'_>,
        p: NamedNodeRef<'_>,
        o: &Term,
    ) -> StoreResult<Vec<Resource>> {
        let mut seen = HashSet::new();
        Ok(self
            .quads(scope, None, Some(p), Some(o))?
            .into_iter()
            .map(|q| q.subject)
            .filter(|s| seen.insert(s.clone()))
            .collect())
    }

    /// Subjects typed with the given class.
    pub fn instances_of(&self, scope: Scope<'_>, class: NamedNodeRef<'_>) -> StoreResult<Vec<Resource>> {
        self.subjects(scope, rdf::TYPE, &term_of(class))
    }

    /// Lexical form of the first literal object of `s p`.
    pub fn literal(
        &self,
        scope: Scope<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
    ) -> StoreResult<Option<String>> {
        Ok(self.literals(scope, s, p)?.into_iter().next())
    }

    /// Lexical forms of every literal object of `s p`.
    pub fn literals(
        &self,
        scope: Scope<'_>,
        s: &Resource,
        p: NamedNodeRef<'_>,
    ) -> StoreResult<Vec<String>> {
        Ok(self
            .objects(scope, s, p)?
            .iter()
            .filter_map(as_literal)
            .map(|l: &Literal| l.value().to_string())
            .collect())
    }

    /// Members of the RDF collection starting at `head`.
    ///
    /// Stops at `rdf:nil`, at a missing `rdf:rest`, or on a cycle.
    pub fn resource_list(&self, scope: Scope<'_>, head: &Resource) -> StoreResult<Vec<Term>> {
        let nil = super::named(rdf::NIL);
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = head.clone();
        while cursor != nil && visited.insert(cursor.clone()) {
            if let Some(first) = self.value(scope, &cursor, rdf::FIRST)? {
                items.push(first);
            }
            match self.value(scope, &cursor, rdf::REST)?.as_ref().and_then(as_resource) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(items)
    }

    /// Whether `node` is the head of an RDF collection.
    pub fn is_list(&self, scope: Scope<'_>, node: &Resource) -> StoreResult<bool> {
        Ok(self.value(scope, node, rdf::FIRST)?.is_some())
    }

    /// Build an RDF collection in the context and return its head.
    pub fn write_list(&self, ctx: NamedNodeRef<'_>, items: &[Term]) -> StoreResult<Resource> {
        let nil = super::named(rdf::NIL);
        let Some((last, rest)) = items.split_last() else {
            return Ok(nil);
        };
        let mut next = blank();
        self.insert(ctx, &next, rdf::FIRST, last)?;
        self.insert(ctx, &next, rdf::REST, &term(&nil))?;
        for item in rest.iter().rev() {
            let cell = blank();
            self.insert(ctx, &cell, rdf::FIRST, item)?;
            self.insert(ctx, &cell, rdf::REST, &term(&next))?;
            next = cell;
        }
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // SPARQL
    // -----------------------------------------------------------------------

    /// Run a SPARQL SELECT and return the bound terms of each solution.
    ///
    /// The query's default graph is the store's default graph, so patterns
    /// over harvested data must use `GRAPH ?g { ... }`.
    pub fn select(&self, sparql: &str) -> StoreResult<Vec<Row>> {
        let results = self.store.query(sparql).map_err(|e| StoreError::Sparql {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| StoreError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    rows.push(
                        solution
                            .iter()
                            .map(|(var, t)| (var.as_str().to_string(), t.clone()))
                            .collect(),
                    );
                }
                Ok(rows)
            }
            _ => Err(StoreError::Sparql {
                message: "expected solutions from SELECT query".into(),
            }),
        }
    }

    /// Resources bound to `var` across every solution, deduplicated in order.
    pub fn select_resources(&self, sparql: &str, var: &str) -> StoreResult<Vec<Resource>> {
        let mut seen = HashSet::new();
        Ok(self
            .select(sparql)?
            .iter()
            .filter_map(|row| row.get(var).and_then(as_resource))
            .filter(|r| seen.insert(r.clone()))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Identifier rewriting
    // -----------------------------------------------------------------------

    /// Replace identifiers in subject and object position within the scope.
    ///
    /// Triples whose predicate is in `exempt` keep their original object, so
    /// links such as `owl:sameAs` still point at the identifier that was
    /// replaced. Returns the number of quads rewritten.
    pub fn rewrite_identifiers(
        &self,
        scope: Scope<'_>,
        map: &HashMap<Resource, Resource>,
        exempt: &[NamedNodeRef<'_>],
    ) -> StoreResult<usize> {
        if map.is_empty() {
            return Ok(0);
        }
        let mut rewritten = 0;
        for quad in self.quads(scope, None, None, None)? {
            let new_subject = map.get(&quad.subject);
            let new_object = if exempt.iter().any(|p| *p == quad.predicate.as_ref()) {
                None
            } else {
                as_resource(&quad.object).and_then(|o| map.get(&o))
            };
            if new_subject.is_none() && new_object.is_none() {
                continue;
            }
            let replacement = Quad::new(
                new_subject.cloned().unwrap_or_else(|| quad.subject.clone()),
                quad.predicate.clone(),
                new_object.map(term).unwrap_or_else(|| quad.object.clone()),
                quad.graph_name.clone(),
            );
            self.remove_quad(&quad)?;
            self.insert_quad(&replacement)?;
            rewritten += 1;
        }
        tracing::debug!(rewritten, identifiers = map.len(), "rewrote identifiers");
        Ok(rewritten)
    }
}
