//! Local HTML+RDFa fixtures.
//!
//! Some biographies and collection descriptions are not published anywhere
//! the harvester can reach, so they ship with the data as HTML files. Each
//! file becomes one context, named by the web page it describes.

use std::path::{Path, PathBuf};

use oxigraph::model::{NamedNode, Term, Triple};
use url::Url;

use crate::error::HarvestError;
use crate::graph::{GraphStore, Resource, named_node, term_of};
use crate::vocab::{rdf, schema};

use super::{HarvestResult, rdfa};

/// Loads local RDFa files into the store.
pub struct LocalRdf<'a> {
    store: &'a GraphStore,
}

impl<'a> LocalRdf<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Load every file, skipping the ones that cannot be read. Returns the
    /// number of triples added.
    pub fn load_files(&self, paths: &[PathBuf]) -> usize {
        let mut total = 0;
        for path in paths {
            match self.load_file(path) {
                Ok(added) => {
                    tracing::debug!(path = %path.display(), triples = added, "loaded local RDFa");
                    total += added;
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping local fixture"),
            }
        }
        tracing::info!(files = paths.len(), triples = total, "added local RDFa");
        total
    }

    pub fn load_file(&self, path: &Path) -> HarvestResult<usize> {
        let fixture_err = |source| HarvestError::Fixture {
            path: path.display().to_string(),
            source,
        };
        let html = std::fs::read_to_string(path).map_err(fixture_err)?;
        let absolute = std::fs::canonicalize(path).map_err(fixture_err)?;
        let file_url = Url::from_file_path(&absolute).map_err(|()| HarvestError::Parse {
            url: absolute.display().to_string(),
            message: "cannot express path as a file URL".into(),
        })?;
        self.load_html(&html, file_url.as_str())
    }

    /// Load one document. The context is the first `schema:WebPage` in the
    /// data, or `file_url` when the page does not describe itself.
    pub fn load_html(&self, html: &str, file_url: &str) -> HarvestResult<usize> {
        let triples = rdfa::extract(html, file_url)?;
        let ctx = match web_page(&triples) {
            Some(page) => page,
            None => named_node(file_url)?,
        };
        self.store.remove_context(ctx.as_ref())?;
        Ok(self.store.insert_triples(ctx.as_ref(), triples)?)
    }
}

fn web_page(triples: &[Triple]) -> Option<NamedNode> {
    let web_page: Term = term_of(schema::WEB_PAGE);
    triples.iter().find_map(|t| match &t.subject {
        Resource::NamedNode(page) if t.predicate == rdf::TYPE && t.object == web_page => {
            Some(page.clone())
        }
        _ => None,
    })
}
