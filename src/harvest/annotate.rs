//! Annotation of linked entities with the minimum the site needs from their
//! authoritative sources: coordinates for GeoNames places, names and DBpedia
//! links for VIAF people, abstracts and Wikipedia links for DBpedia people.
//!
//! Each source gets its own context. Entities that already carry the data
//! are not fetched again.

use std::sync::LazyLock;

use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use regex::Regex;
use url::Url;

use crate::config::PrepConfig;
use crate::error::HarvestError;
use crate::graph::{GraphStore, Scope, named_node, resource_str};
use crate::vocab::{dbpedia_owl, foaf, geo, owl, schema, sparql_prefixes};

use super::{FetchResponse, Fetcher, HarvestResult};

pub const GEONAMES_CONTEXT: &str = "http://geonames.org/";
pub const VIAF_CONTEXT: &str = "http://viaf.org/";
pub const DBPEDIA_CONTEXT: &str = "http://dbpedia.org/";

const RDF_XML: &str = "application/rdf+xml";

// Also matches sws.geonames.org and URIs without the trailing slash.
static RE_GEONAMES_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[a-z]+\.geonames\.org/(?P<id>\d+)/?").unwrap());

/// Entities annotated per source, and fetches that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateReport {
    pub places: usize,
    pub viaf_people: usize,
    pub dbpedia_people: usize,
    pub failures: usize,
}

pub struct Annotator<'a> {
    store: &'a GraphStore,
    fetcher: &'a dyn Fetcher,
    local_base: String,
    dbpedia_endpoint: String,
}

impl<'a> Annotator<'a> {
    pub fn new(store: &'a GraphStore, fetcher: &'a dyn Fetcher, config: &PrepConfig) -> Self {
        Self {
            store,
            fetcher,
            local_base: config.local_base(),
            dbpedia_endpoint: config.dbpedia_endpoint.clone(),
        }
    }

    /// Annotate places, then VIAF people, then the DBpedia resources the
    /// VIAF records point at.
    pub fn run(&self) -> HarvestResult<AnnotateReport> {
        let mut report = AnnotateReport::default();
        self.places(&mut report)?;
        self.viaf_people(&mut report)?;
        self.dbpedia_people(&mut report)?;
        tracing::info!(
            places = report.places,
            viaf = report.viaf_people,
            dbpedia = report.dbpedia_people,
            failures = report.failures,
            "annotated related resources"
        );
        Ok(report)
    }

    fn places(&self, report: &mut AnnotateReport) -> HarvestResult<()> {
        let ctx = named_node(GEONAMES_CONTEXT)?;
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?uri WHERE {{
                GRAPH ?g {{ ?uri rdf:type schema:Place }}
                FILTER(isIRI(?uri))
            }}",
            prefixes = sparql_prefixes(),
        );
        let places = self.store.select_resources(&query, "uri")?;
        tracing::debug!(count = places.len(), "places to annotate");

        for place in places {
            let uri = resource_str(&place);
            if !uri.starts_with("http") || self.store.value(Scope::Union, &place, geo::LAT)?.is_some() {
                continue;
            }
            // Content negotiation fails on some GeoNames URIs; about.rdf does not.
            let rdf_url = match RE_GEONAMES_ID.captures(uri) {
                Some(caps) => format!("http://www.geonames.org/{}/about.rdf", &caps["id"]),
                None => uri.to_string(),
            };
            let description = match self.fetch_rdf(&rdf_url, &rdf_url) {
                Ok(description) => description,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(uri, error = %e, "failed to load place");
                    continue;
                }
            };
            for predicate in [geo::LAT, geo::LONG] {
                if let Some(value) = description.value(Scope::Union, &place, predicate)? {
                    self.store.set(ctx.as_ref(), &place, predicate, &value)?;
                }
            }
            report.places += 1;
        }
        Ok(())
    }

    fn viaf_people(&self, report: &mut AnnotateReport) -> HarvestResult<()> {
        let ctx = named_node(VIAF_CONTEXT)?;
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?viaf WHERE {{
                GRAPH ?g1 {{ ?uri rdf:type schema:Person }}
                GRAPH ?g2 {{ ?uri owl:sameAs ?viaf }}
                FILTER(STRSTARTS(STR(?uri), \"{local}\"))
                FILTER(STRSTARTS(STR(?viaf), \"http://viaf.org\"))
            }}",
            prefixes = sparql_prefixes(),
            local = self.local_base,
        );
        let people = self.store.select_resources(&query, "viaf")?;
        tracing::debug!(count = people.len(), "VIAF people to annotate");

        for viaf in people {
            if !self.store.objects(Scope::Union, &viaf, foaf::NAME)?.is_empty() {
                continue;
            }
            let uri = resource_str(&viaf);
            let record = match self.fetch_rdf(uri, uri) {
                Ok(record) => record,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(uri, error = %e, "failed to load VIAF record");
                    continue;
                }
            };

            // VIAF names carry no language tag, so every name is kept.
            for name in record.objects(Scope::Union, &viaf, foaf::NAME)? {
                self.store.insert(ctx.as_ref(), &viaf, foaf::NAME, &name)?;
                tracing::debug!(uri, name = %name, "added VIAF name");
            }
            // VIAF now uses schema:sameAs; owl:sameAs is what the rest of the
            // pipeline follows.
            let mut same_as = record.objects(Scope::Union, &viaf, owl::SAME_AS)?;
            same_as.extend(record.objects(Scope::Union, &viaf, schema::SAME_AS)?);
            for target in same_as {
                if matches!(&target, Term::NamedNode(n) if n.as_str().contains("dbpedia.org")) {
                    self.store.insert(ctx.as_ref(), &viaf, owl::SAME_AS, &target)?;
                }
            }
            report.viaf_people += 1;
        }
        Ok(())
    }

    fn dbpedia_people(&self, report: &mut AnnotateReport) -> HarvestResult<()> {
        let ctx = named_node(DBPEDIA_CONTEXT)?;
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?dbp WHERE {{
                GRAPH ?g1 {{ ?uri rdf:type schema:Person }}
                GRAPH ?g2 {{ ?uri owl:sameAs ?viaf }}
                GRAPH ?g3 {{ ?viaf owl:sameAs ?dbp }}
                FILTER(STRSTARTS(STR(?uri), \"{local}\"))
                FILTER(STRSTARTS(STR(?dbp), \"http://dbpedia.org\"))
            }}",
            prefixes = sparql_prefixes(),
            local = self.local_base,
        );
        let resources = self.store.select_resources(&query, "dbp")?;
        tracing::debug!(count = resources.len(), "DBpedia people to annotate");

        for dbp in resources {
            // Every DBpedia resource links to its Wikipedia page.
            if self
                .store
                .value(Scope::Union, &dbp, foaf::IS_PRIMARY_TOPIC_OF)?
                .is_some()
            {
                continue;
            }
            let uri = resource_str(&dbp);
            let description = match self.describe(uri) {
                Ok(description) => description,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(uri, error = %e, "failed to describe DBpedia resource");
                    continue;
                }
            };
            for predicate in [dbpedia_owl::ABSTRACT, foaf::IS_PRIMARY_TOPIC_OF] {
                let values = description.objects(Scope::Union, &dbp, predicate)?;
                if let Some(value) = prefer_english(values) {
                    self.store.insert(ctx.as_ref(), &dbp, predicate, &value)?;
                }
            }
            report.dbpedia_people += 1;
        }
        Ok(())
    }

    /// `DESCRIBE` a resource against the DBpedia endpoint.
    fn describe(&self, uri: &str) -> HarvestResult<GraphStore> {
        let url = describe_url(&self.dbpedia_endpoint, uri)?;
        self.fetch_rdf(&url, uri)
    }

    /// Fetch an RDF document into a scratch store.
    fn fetch_rdf(&self, url: &str, base_iri: &str) -> HarvestResult<GraphStore> {
        let response = self.fetcher.get(url, &[("Accept", RDF_XML)])?;
        if response.status != 200 {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        parse_scratch(url, base_iri, &response)
    }
}

/// Endpoint URL carrying a `DESCRIBE` query for `uri`.
pub fn describe_url(endpoint: &str, uri: &str) -> HarvestResult<String> {
    Url::parse_with_params(endpoint, &[("query", format!("DESCRIBE <{uri}>"))])
        .map(String::from)
        .map_err(|e| HarvestError::Fetch {
            url: endpoint.to_string(),
            message: e.to_string(),
        })
}

fn parse_scratch(url: &str, base_iri: &str, response: &FetchResponse) -> HarvestResult<GraphStore> {
    let scratch = GraphStore::in_memory()?;
    let ctx = named_node(base_iri)?;
    let format = response.rdf_format().unwrap_or(RdfFormat::RdfXml);
    scratch
        .load(ctx.as_ref(), format, base_iri, &response.body)
        .map_err(|e| HarvestError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    Ok(scratch)
}

/// The English value if there are several, otherwise the only one.
fn prefer_english(values: Vec<Term>) -> Option<Term> {
    if values.len() > 1 {
        if let Some(english) = values
            .iter()
            .find(|v| matches!(v, Term::Literal(l) if l.language() == Some("en")))
        {
            return Some(english.clone());
        }
    }
    values.into_iter().next()
}
