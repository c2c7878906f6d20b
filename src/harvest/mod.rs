//! Harvesting RDF from the web into the graph store.
//!
//! Each harvested URL becomes one context of the store, replaced wholesale on
//! every successful fetch. HTTP goes through the [`Fetcher`] trait so the
//! queue logic can run against canned responses.

pub mod annotate;
pub mod local;
pub mod rdfa;

use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::time::Duration;

use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNodeRef, Term};
use url::Url;

use crate::error::HarvestError;
use crate::graph::{GraphStore, Scope, literal, named, named_node, term};
use crate::vocab::{dc, owl, schema};

pub use annotate::{AnnotateReport, Annotator};
pub use local::LocalRdf;

/// Result type for harvesting operations.
pub type HarvestResult<T> = std::result::Result<T, HarvestError>;

/// Maximum response body size (16 MB).
const MAX_RESPONSE_SIZE: u64 = 16 * 1024 * 1024;

/// Log a progress line every this many URLs.
const PROGRESS_EVERY: usize = 10;

/// The parts of an HTTP response the harvester looks at.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub location: Option<String>,
    pub last_modified: Option<String>,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// A `200 OK` response with the given media type and body.
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// RDF serialization of the body, if the media type names one.
    pub fn rdf_format(&self) -> Option<RdfFormat> {
        let media_type = self.content_type.split(';').next().unwrap_or("").trim();
        RdfFormat::from_media_type(media_type)
    }
}

/// HTTP GET without following redirects.
///
/// Non-2xx statuses are returned as responses, not errors; only transport
/// failures are errors.
pub trait Fetcher {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> HarvestResult<FetchResponse>;
}

/// [`Fetcher`] backed by a `ureq` agent.
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(0)
            .user_agent(concat!("belfast-rdf/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Fetcher for UreqFetcher {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> HarvestResult<FetchResponse> {
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => {
                return Err(HarvestError::Fetch {
                    url: url.to_string(),
                    message: t.to_string(),
                });
            }
        };

        let status = response.status();
        let location = response.header("Location").map(String::from);
        let last_modified = response.header("Last-Modified").map(String::from);
        let content_type = response.content_type().to_string();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_SIZE)
            .read_to_end(&mut body)
            .map_err(|e| HarvestError::Fetch {
                url: url.to_string(),
                message: format!("failed to read response body: {e}"),
            })?;

        Ok(FetchResponse {
            status,
            location,
            last_modified,
            content_type,
            body,
        })
    }
}

/// Options controlling a harvest run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestOptions {
    /// Also harvest `dcterms:hasPart` parts and `schema:relatedLink` targets.
    pub find_related: bool,
    /// Send `Cache-Control: no-cache` instead of a conditional request.
    pub no_cache: bool,
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub total: usize,
    pub harvested: usize,
    pub errors: usize,
    pub unmodified: usize,
    pub empty: usize,
    pub redirects: usize,
    pub queued_related: usize,
}

enum Outcome {
    Harvested { triples: usize, related: usize },
    Redirected(String),
    NotModified,
    Empty,
}

/// Sequential harvester over a de-duplicated URL queue.
pub struct Harvester<'a> {
    store: &'a GraphStore,
    fetcher: &'a dyn Fetcher,
    options: HarvestOptions,
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl<'a> Harvester<'a> {
    pub fn new(store: &'a GraphStore, fetcher: &'a dyn Fetcher, options: HarvestOptions) -> Self {
        Self {
            store,
            fetcher,
            options,
            queue: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Harvest every seed, and whatever the seeds lead to.
    ///
    /// Per-URL failures are logged and counted; they never stop the run.
    pub fn run(&mut self, seeds: &[String]) -> HarvestStats {
        for url in seeds {
            self.enqueue(url);
        }
        let show_progress = self.queue.len() >= 5 || self.options.find_related;
        let mut stats = HarvestStats::default();

        while let Some(url) = self.queue.pop_front() {
            match self.harvest_url(&url) {
                Ok(Outcome::Harvested { triples, related }) => {
                    stats.harvested += 1;
                    stats.queued_related += related;
                    tracing::debug!(url = %url, triples, related, "harvested");
                }
                Ok(Outcome::Redirected(target)) => {
                    stats.redirects += 1;
                    tracing::debug!(url = %url, target = %target, "redirect queued");
                    self.enqueue(&target);
                }
                Ok(Outcome::NotModified) => {
                    stats.unmodified += 1;
                    tracing::debug!(url = %url, "not modified since last harvest");
                }
                Ok(Outcome::Empty) => {
                    stats.empty += 1;
                    tracing::warn!(url = %url, "no RDFa data found");
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(url = %url, error = %e, "harvest failed");
                }
            }
            stats.total += 1;
            if show_progress && stats.total % PROGRESS_EVERY == 0 {
                tracing::info!(
                    processed = stats.total,
                    remaining = self.queue.len(),
                    "harvest progress"
                );
            }
        }

        tracing::info!(
            processed = stats.total,
            harvested = stats.harvested,
            errors = stats.errors,
            unmodified = stats.unmodified,
            "harvest complete"
        );
        stats
    }

    /// Queue a URL unless it was already queued or processed.
    fn enqueue(&mut self, url: &str) -> bool {
        if self.seen.insert(url.to_string()) {
            self.queue.push_back(url.to_string());
            true
        } else {
            false
        }
    }

    fn harvest_url(&mut self, url: &str) -> HarvestResult<Outcome> {
        let ctx = named_node(url)?;
        let page = named(ctx.as_ref());

        let last_modified = if self.store.context_len(ctx.as_ref())? > 0 {
            self.store
                .literal(Scope::Context(ctx.as_ref()), &page, schema::DATE_MODIFIED)?
        } else {
            None
        };
        let mut headers = Vec::new();
        if self.options.no_cache {
            headers.push(("Cache-Control", "no-cache"));
        } else if let Some(since) = last_modified.as_deref() {
            headers.push(("If-Modified-Since", since));
        }

        let response = self.fetcher.get(url, &headers)?;
        match response.status {
            // Not followed: links in the target page resolve against the
            // final URL, so the target is harvested as its own context.
            301 | 302 | 303 | 307 | 308 => {
                let redirect_err = || HarvestError::Redirect {
                    url: url.to_string(),
                };
                let location = response.location.as_deref().ok_or_else(redirect_err)?;
                let target = Url::parse(url)
                    .and_then(|base| base.join(location))
                    .map_err(|_| redirect_err())?;
                return Ok(Outcome::Redirected(target.to_string()));
            }
            304 => return Ok(Outcome::NotModified),
            status if status >= 400 => {
                return Err(HarvestError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            _ => {}
        }

        self.store.remove_context(ctx.as_ref())?;
        let triples = match self.parse_into(ctx.as_ref(), url, &response) {
            Ok(n) => n,
            Err(e) => {
                self.store.remove_context(ctx.as_ref())?;
                return Err(e);
            }
        };
        if triples == 0 {
            return Ok(Outcome::Empty);
        }

        if let Some(modified) = &response.last_modified {
            self.store
                .set(ctx.as_ref(), &page, schema::DATE_MODIFIED, &literal(modified.as_str()))?;
        }

        let related = if self.options.find_related {
            self.queue_related(ctx.as_ref())?
        } else {
            0
        };
        Ok(Outcome::Harvested { triples, related })
    }

    fn parse_into(
        &self,
        ctx: NamedNodeRef<'_>,
        url: &str,
        response: &FetchResponse,
    ) -> HarvestResult<usize> {
        match response.rdf_format() {
            Some(format) => {
                self.store
                    .load(ctx, format, url, &response.body)
                    .map_err(|e| HarvestError::Parse {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(self.store.context_len(ctx)?)
            }
            None => {
                let html = String::from_utf8_lossy(&response.body);
                let triples = rdfa::extract(&html, url)?;
                Ok(self.store.insert_triples(ctx, triples)?)
            }
        }
    }

    /// Queue parts of the page and every related link found in its context.
    fn queue_related(&mut self, ctx: NamedNodeRef<'_>) -> HarvestResult<usize> {
        let scope = Scope::Context(ctx);
        let page = named(ctx);
        let mut found = Vec::new();

        for quad in self.store.quads(scope, None, Some(dc::HAS_PART), None)? {
            if quad.subject == page
                || self.store.contains(scope, &quad.subject, owl::SAME_AS, &term(&page))?
            {
                found.push(quad.object);
            }
        }
        // Finding aids put relatedLink on the collection, not the page.
        for quad in self.store.quads(scope, None, Some(schema::RELATED_LINK), None)? {
            found.push(quad.object);
        }

        let mut queued = 0;
        for object in found {
            let target = match &object {
                Term::NamedNode(n) => n.as_str().to_string(),
                Term::Literal(l) if Url::parse(l.value()).is_ok() => l.value().to_string(),
                _ => continue,
            };
            if self.enqueue(&target) {
                queued += 1;
            }
        }
        if queued > 0 {
            tracing::debug!(context = ctx.as_str(), queued, "queued related URLs");
        }
        Ok(queued)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::graph::iri;

    /// Canned responses keyed by URL; records the headers of every request.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pub responses: HashMap<String, FetchResponse>,
        pub requests: RefCell<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeFetcher {
        pub fn with(mut self, url: &str, response: FetchResponse) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        pub fn requested(&self, url: &str) -> usize {
            self.requests.borrow().iter().filter(|(u, _)| u == url).count()
        }

        pub fn header_sent(&self, url: &str, name: &str) -> Option<String> {
            self.requests
                .borrow()
                .iter()
                .rev()
                .find(|(u, _)| u == url)
                .and_then(|(_, headers)| {
                    headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
                })
        }
    }

    impl Fetcher for FakeFetcher {
        fn get(&self, url: &str, headers: &[(&str, &str)]) -> HarvestResult<FetchResponse> {
            self.requests.borrow_mut().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect(),
            ));
            self.responses.get(url).cloned().ok_or_else(|| HarvestError::Fetch {
                url: url.to_string(),
                message: "connection refused".into(),
            })
        }
    }

    const PAGE: &str = "http://findingaids.example/documents/hobsbaum/";
    const SERIES: &str = "http://findingaids.example/documents/hobsbaum/series1/";

    fn page_html() -> String {
        format!(
            r#"<html><body vocab="http://schema.org/">
            <div about="{PAGE}" typeof="WebPage">
              <span property="name">Philip Hobsbaum papers</span>
              <span rel="dc:hasPart" resource="{SERIES}"></span>
            </div>
            <div about="{PAGE}#coll" typeof="arch:Collection">
              <a rel="relatedLink" href="http://findingaids.example/documents/longley/">Longley</a>
            </div>
            </body></html>"#
        )
    }

    fn series_html() -> String {
        format!(
            r#"<html><body vocab="http://schema.org/">
            <div about="{SERIES}"><span property="name">Series 1</span></div>
            </body></html>"#
        )
    }

    #[test]
    fn harvests_page_into_its_own_context() {
        let store = GraphStore::in_memory().unwrap();
        let mut page = FetchResponse::ok("text/html", page_html());
        page.last_modified = Some("Tue, 01 Oct 2013 12:00:00 GMT".into());
        let fetcher = FakeFetcher::default().with(PAGE, page);

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default()).run(&[PAGE.into()]);

        assert_eq!(stats.harvested, 1);
        assert_eq!(stats.errors, 0);
        let ctx = named_node(PAGE).unwrap();
        let page_node = iri(PAGE).unwrap();
        assert_eq!(
            store
                .literal(Scope::Context(ctx.as_ref()), &page_node, schema::NAME)
                .unwrap()
                .as_deref(),
            Some("Philip Hobsbaum papers")
        );
        assert_eq!(
            store
                .literal(Scope::Context(ctx.as_ref()), &page_node, schema::DATE_MODIFIED)
                .unwrap()
                .as_deref(),
            Some("Tue, 01 Oct 2013 12:00:00 GMT")
        );
    }

    #[test]
    fn related_urls_are_followed_when_enabled() {
        let store = GraphStore::in_memory().unwrap();
        let fetcher = FakeFetcher::default()
            .with(PAGE, FetchResponse::ok("text/html", page_html()))
            .with(SERIES, FetchResponse::ok("text/html", series_html()));
        let options = HarvestOptions {
            find_related: true,
            no_cache: false,
        };

        let stats = Harvester::new(&store, &fetcher, options).run(&[PAGE.into()]);

        assert_eq!(stats.queued_related, 2);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.harvested, 2);
        // The longley page has no canned response.
        assert_eq!(stats.errors, 1);
        assert_eq!(fetcher.requested(SERIES), 1);
    }

    #[test]
    fn redirect_target_is_queued_not_followed() {
        let store = GraphStore::in_memory().unwrap();
        let redirect = FetchResponse {
            status: 303,
            location: Some("/documents/hobsbaum/".into()),
            ..FetchResponse::default()
        };
        let fetcher = FakeFetcher::default()
            .with("http://findingaids.example/old/", redirect)
            .with(PAGE, FetchResponse::ok("text/html", page_html()));

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default())
            .run(&["http://findingaids.example/old/".into()]);

        assert_eq!(stats.redirects, 1);
        assert_eq!(stats.harvested, 1);
        let contexts: Vec<String> = store
            .contexts()
            .unwrap()
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        assert_eq!(contexts, vec![PAGE.to_string()]);
    }

    #[test]
    fn unmodified_page_keeps_its_context() {
        let store = GraphStore::in_memory().unwrap();
        let ctx = named_node(PAGE).unwrap();
        let page_node = iri(PAGE).unwrap();
        store
            .insert(ctx.as_ref(), &page_node, schema::DATE_MODIFIED, &literal("Mon, 01 Jul 2013 00:00:00 GMT"))
            .unwrap();
        store.insert(ctx.as_ref(), &page_node, schema::NAME, &literal("cached")).unwrap();
        let not_modified = FetchResponse {
            status: 304,
            ..FetchResponse::default()
        };
        let fetcher = FakeFetcher::default().with(PAGE, not_modified);

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default()).run(&[PAGE.into()]);

        assert_eq!(stats.unmodified, 1);
        assert_eq!(
            fetcher.header_sent(PAGE, "If-Modified-Since").as_deref(),
            Some("Mon, 01 Jul 2013 00:00:00 GMT")
        );
        assert_eq!(store.context_len(ctx.as_ref()).unwrap(), 2);
    }

    #[test]
    fn no_cache_replaces_conditional_request() {
        let store = GraphStore::in_memory().unwrap();
        let ctx = named_node(PAGE).unwrap();
        store
            .insert(ctx.as_ref(), &iri(PAGE).unwrap(), schema::DATE_MODIFIED, &literal("yesterday"))
            .unwrap();
        let fetcher = FakeFetcher::default().with(PAGE, FetchResponse::ok("text/html", page_html()));
        let options = HarvestOptions {
            find_related: false,
            no_cache: true,
        };

        Harvester::new(&store, &fetcher, options).run(&[PAGE.into()]);

        assert_eq!(fetcher.header_sent(PAGE, "Cache-Control").as_deref(), Some("no-cache"));
        assert_eq!(fetcher.header_sent(PAGE, "If-Modified-Since"), None);
    }

    #[test]
    fn errors_are_counted_and_the_run_continues() {
        let store = GraphStore::in_memory().unwrap();
        let missing = FetchResponse {
            status: 404,
            ..FetchResponse::default()
        };
        let fetcher = FakeFetcher::default()
            .with("http://findingaids.example/missing/", missing)
            .with(PAGE, FetchResponse::ok("text/html", page_html()));

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default()).run(&[
            "http://findingaids.example/missing/".into(),
            "http://unreachable.example/".into(),
            PAGE.into(),
        ]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.harvested, 1);
    }

    #[test]
    fn rdf_xml_responses_are_parsed_directly() {
        let store = GraphStore::in_memory().unwrap();
        let body = r#"<?xml version="1.0"?>
            <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                     xmlns:schema="http://schema.org/">
              <schema:Person rdf:about="http://viaf.org/viaf/91907300">
                <schema:name>Philip Hobsbaum</schema:name>
              </schema:Person>
            </rdf:RDF>"#;
        let url = "http://viaf.org/viaf/91907300";
        let fetcher = FakeFetcher::default().with(url, FetchResponse::ok("application/rdf+xml; charset=UTF-8", body));

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default()).run(&[url.into()]);

        assert_eq!(stats.harvested, 1);
        let ctx = named_node(url).unwrap();
        assert_eq!(store.context_len(ctx.as_ref()).unwrap(), 2);
    }

    #[test]
    fn page_without_rdfa_is_reported_empty() {
        let store = GraphStore::in_memory().unwrap();
        let fetcher = FakeFetcher::default()
            .with(PAGE, FetchResponse::ok("text/html", "<html><body><p>nothing</p></body></html>"));

        let stats = Harvester::new(&store, &fetcher, HarvestOptions::default()).run(&[PAGE.into()]);

        assert_eq!(stats.empty, 1);
        assert_eq!(stats.harvested, 0);
        assert!(store.is_empty().unwrap());
    }
}
