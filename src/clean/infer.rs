//! Relations the sources only imply.
//!
//! Per context: Group sheets get a coverage period, the creators of archival
//! collections are taken to have owned the sheets their collections mention,
//! poem authors are linked to whatever their poems mention, and every
//! Group-sheet author or owner is affiliated with the Group.
//!
//! Ownership and writes-about are heuristics and can be switched off through
//! [`Heuristics`].

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use oxigraph::model::NamedNodeRef;
use regex::Regex;

use crate::config::{Heuristics, PrepConfig};
use crate::graph::{
    GraphStore, Resource, Scope, StoreResult, as_literal, as_resource, literal, resource_str,
    sort_resources, term, term_of,
};
use crate::qub::QUB_COLLECTION;
use crate::vocab::{BELFAST_GROUP, arch, bg, dc, freebase, rdf, schema, sparql_prefixes};

use super::{EXEMPT_PREDICATES, ProfileUris, is_local};

static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})(-(?P<month>\d{2})-(?P<day>\d{2}))?(/(?P<year2>\d{4}))?$").unwrap()
});

/// A Group meeting period and its `dc:coverage` value.
#[derive(Debug, Clone, Copy)]
pub struct Period {
    pub coverage: &'static str,
    start: (i32, u32, u32),
    end: (i32, u32, u32),
}

impl Period {
    /// Whether `date` falls within the period, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let (sy, sm, sd) = self.start;
        let (ey, em, ed) = self.end;
        match (NaiveDate::from_ymd_opt(sy, sm, sd), NaiveDate::from_ymd_opt(ey, em, ed)) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

/// October 1963 to March 1966, Hobsbaum's meetings.
pub const FIRST_PERIOD: Period = Period {
    coverage: "1963-1966",
    start: (1963, 10, 1),
    end: (1966, 3, 30),
};

/// April 1966 to 1972.
pub const SECOND_PERIOD: Period = Period {
    coverage: "1966-1972",
    start: (1966, 4, 1),
    end: (1972, 12, 31),
};

/// Coverage values from the sources that are made consistent with the periods.
const COVERAGE_CONVERSIONS: &[(&str, &str)] = &[
    ("1963-1968", "1963-1966"),
    ("1963-1972", "1963-1966"),
    ("1966-1976", "1966-1972"),
];

/// Parse `YYYY`, `YYYY-MM-DD` or `YYYY/YYYY`; missing month and day are January 1.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = RE_DATE.captures(s.trim())?;
    let year = caps["year"].parse().ok()?;
    let month = caps.name("month").map_or(Some(1), |m| m.as_str().parse().ok())?;
    let day = caps.name("day").map_or(Some(1), |d| d.as_str().parse().ok())?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Coverage period of a date, if it falls in either period.
pub fn classify(date: NaiveDate) -> Option<&'static str> {
    [FIRST_PERIOD, SECOND_PERIOD]
        .into_iter()
        .find(|p| p.contains(date))
        .map(|p| p.coverage)
}

fn convert_coverage(coverage: &str) -> Option<&'static str> {
    COVERAGE_CONVERSIONS
        .iter()
        .find(|(from, _)| *from == coverage)
        .map(|(_, to)| *to)
}

/// What an inference pass added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferReport {
    /// Coverage values assigned or converted.
    pub coverage: usize,
    pub ownership: usize,
    pub writes_about: usize,
    pub affiliations: usize,
    /// Owners given a local profile URI during this pass.
    pub profiles: usize,
}

/// Adds implied relations.
pub struct Inferencer<'a> {
    store: &'a GraphStore,
    heuristics: Heuristics,
    local_base: String,
    profiles: ProfileUris<'a>,
}

impl<'a> Inferencer<'a> {
    pub fn new(store: &'a GraphStore, config: &PrepConfig) -> Self {
        Self {
            store,
            heuristics: config.heuristics,
            local_base: config.local_base(),
            profiles: ProfileUris::new(store, config),
        }
    }

    /// Process every context.
    pub fn run(&self) -> StoreResult<InferReport> {
        let mut report = InferReport::default();
        for ctx in self.store.contexts()? {
            self.process_context(ctx.as_ref(), &mut report)?;
        }
        tracing::info!(
            coverage = report.coverage,
            ownership = report.ownership,
            writes_about = report.writes_about,
            affiliations = report.affiliations,
            "inferred connections"
        );
        Ok(report)
    }

    fn process_context(&self, ctx: NamedNodeRef<'_>, report: &mut InferReport) -> StoreResult<()> {
        if self.heuristics.writes_about {
            report.writes_about += self.writes_about(ctx)?;
        }

        let mut sheets = self.store.instances_of(Scope::Context(ctx), bg::GROUP_SHEET)?;
        if sheets.is_empty() {
            return Ok(());
        }
        sort_resources(&mut sheets);

        for ms in &sheets {
            if self.time_period(ctx, ms)? {
                report.coverage += 1;
            }
            if self.heuristics.ownership {
                report.ownership += self.ownership(ctx, ms)?;
            }
        }

        self.affiliate(ctx, report)
    }

    /// Assign or normalize `dc:coverage`. Returns whether anything changed.
    pub fn time_period(&self, ctx: NamedNodeRef<'_>, ms: &Resource) -> StoreResult<bool> {
        let coverage_term = self.store.value(Scope::Union, ms, dc::COVERAGE)?;
        if let Some(coverage) = coverage_term.as_ref().and_then(as_literal) {
            let Some(converted) = convert_coverage(coverage.value()) else {
                return Ok(false);
            };
            let old = literal(coverage.value());
            for holder in self.store.contexts_containing(ms, dc::COVERAGE, &old)? {
                self.store.set(holder.as_ref(), ms, dc::COVERAGE, &literal(converted))?;
            }
            return Ok(true);
        }

        let parsed = self
            .store
            .literal(Scope::Context(ctx), ms, dc::DATE)?
            .and_then(|d| parse_date(&d));

        let period = match parsed {
            Some(date) => classify(date),
            None => {
                // the QUB collection is complete for the first period
                if self.in_qub_collection(ms)? {
                    Some(FIRST_PERIOD.coverage)
                } else {
                    Some(SECOND_PERIOD.coverage)
                }
            }
        };
        match period {
            Some(coverage) => {
                self.store.set(ctx, ms, dc::COVERAGE, &literal(coverage))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn in_qub_collection(&self, ms: &Resource) -> StoreResult<bool> {
        Ok(self
            .store
            .contexts_containing(ms, rdf::TYPE, &term_of(bg::GROUP_SHEET))?
            .iter()
            .any(|c| c.as_ref() == QUB_COLLECTION))
    }

    /// Creators of archival collections that mention `ms` own it.
    pub fn ownership(&self, ctx: NamedNodeRef<'_>, ms: &Resource) -> StoreResult<usize> {
        let mut added = 0;
        let mut collections = self.store.subjects(Scope::Union, schema::MENTIONS, &term(ms))?;
        sort_resources(&mut collections);
        for coll in collections {
            if !self
                .store
                .contains(Scope::Union, &coll, rdf::TYPE, &term_of(arch::COLLECTION))?
            {
                continue;
            }
            let creator = match self.store.value(Scope::Context(ctx), &coll, schema::CREATOR)? {
                Some(c) => Some(c),
                None => self.store.value(Scope::Union, &coll, schema::CREATOR)?,
            };
            let Some(owner) = creator.as_ref().and_then(as_resource) else {
                continue;
            };
            if self.store.insert(ctx, &owner, schema::OWNS, &term(ms))? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Poem authors are linked to what their poems mention.
    pub fn writes_about(&self, ctx: NamedNodeRef<'_>) -> StoreResult<usize> {
        let mut added = 0;
        for poem in self.store.instances_of(Scope::Context(ctx), freebase::POEM)? {
            let mut authors: Vec<Resource> = self
                .store
                .objects(Scope::Union, &poem, dc::CREATOR)?
                .iter()
                .filter_map(as_resource)
                .collect();
            sort_resources(&mut authors);
            let Some(author) = authors.first() else {
                continue;
            };
            for mentioned in self.store.objects(Scope::Context(ctx), &poem, schema::MENTIONS)? {
                if !self.store.contains(Scope::Context(ctx), author, schema::MENTIONS, &mentioned)? {
                    self.store.insert(ctx, author, schema::MENTIONS, &mentioned)?;
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Affiliate Group-sheet authors and owners with the Group, giving owners
    /// that still lack one a local profile URI.
    fn affiliate(&self, ctx: NamedNodeRef<'_>, report: &mut InferReport) -> StoreResult<()> {
        let query = format!(
            "{prefixes}
            SELECT DISTINCT ?person WHERE {{
                GRAPH <{ctx}> {{
                    ?ms rdf:type bg:GroupSheet .
                    {{ ?ms dc:creator ?person }} UNION {{ ?person schema:owns ?ms }}
                }}
            }}",
            prefixes = sparql_prefixes(),
            ctx = ctx.as_str(),
        );
        let mut people = self.store.select_resources(&query, "person")?;
        sort_resources(&mut people);

        let group = term_of(BELFAST_GROUP);
        for person in people {
            if !self.store.contains(Scope::Context(ctx), &person, schema::AFFILIATION, &group)? {
                self.store.insert(ctx, &person, schema::AFFILIATION, &group)?;
                report.affiliations += 1;
            }

            if is_local(&person, &self.local_base) {
                continue;
            }
            if let Some(local) = self.profiles.convert_to_local_profile(ctx, &person)? {
                if local != person {
                    tracing::debug!(
                        person = resource_str(&person),
                        local = resource_str(&local),
                        "local profile for owner"
                    );
                    let map = HashMap::from([(person, local)]);
                    self.store
                        .rewrite_identifiers(Scope::Union, &map, &EXEMPT_PREDICATES)?;
                    report.profiles += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{blank, iri};

    const CTX: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://example.org/ead/");

    fn config(heuristics: Heuristics) -> PrepConfig {
        PrepConfig {
            local_domain: "bg.example.org".into(),
            heuristics,
            ..PrepConfig::default()
        }
    }

    fn groupsheet(store: &GraphStore, ctx: NamedNodeRef<'_>) -> Resource {
        let ms = blank();
        store.insert(ctx, &ms, rdf::TYPE, &term_of(bg::GROUP_SHEET)).unwrap();
        ms
    }

    fn coverage(store: &GraphStore, ms: &Resource) -> Option<String> {
        store.literal(Scope::Union, ms, dc::COVERAGE).unwrap()
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("1966-03-30"), NaiveDate::from_ymd_opt(1966, 3, 30));
        assert_eq!(parse_date("1965"), NaiveDate::from_ymd_opt(1965, 1, 1));
        assert_eq!(parse_date("1963/1966"), NaiveDate::from_ymd_opt(1963, 1, 1));
        assert_eq!(parse_date("1966-13-40"), None);
        assert_eq!(parse_date("March 1966"), None);
    }

    #[test]
    fn period_boundaries_are_inclusive() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(classify(d(1966, 3, 30)), Some("1963-1966"));
        assert_eq!(classify(d(1966, 4, 1)), Some("1966-1972"));
        assert_eq!(classify(d(1963, 10, 1)), Some("1963-1966"));
        assert_eq!(classify(d(1966, 3, 31)), None);
        assert_eq!(classify(d(1963, 1, 1)), None);
        assert_eq!(classify(d(1973, 1, 1)), None);
    }

    #[test]
    fn time_period_from_date_collection_or_default() {
        let store = GraphStore::in_memory().unwrap();
        let inferencer = Inferencer::new(&store, &config(Heuristics::default()));

        let dated = groupsheet(&store, CTX);
        store.insert(CTX, &dated, dc::DATE, &literal("1966-03-22")).unwrap();
        let undated = groupsheet(&store, CTX);
        let qub = groupsheet(&store, QUB_COLLECTION);
        let out_of_range = groupsheet(&store, CTX);
        store.insert(CTX, &out_of_range, dc::DATE, &literal("1975")).unwrap();

        inferencer.run().unwrap();
        assert_eq!(coverage(&store, &dated).as_deref(), Some("1963-1966"));
        assert_eq!(coverage(&store, &undated).as_deref(), Some("1966-1972"));
        assert_eq!(coverage(&store, &qub).as_deref(), Some("1963-1966"));
        assert_eq!(coverage(&store, &out_of_range), None);
    }

    #[test]
    fn inconsistent_coverage_is_converted() {
        let store = GraphStore::in_memory().unwrap();
        let inferencer = Inferencer::new(&store, &config(Heuristics::default()));
        let ms = groupsheet(&store, CTX);
        store.insert(CTX, &ms, dc::COVERAGE, &literal("1966-1976")).unwrap();
        store.insert(CTX, &ms, dc::DATE, &literal("1964-01-01")).unwrap();

        assert!(inferencer.time_period(CTX, &ms).unwrap());
        assert_eq!(coverage(&store, &ms).as_deref(), Some("1966-1972"));
        assert!(!inferencer.time_period(CTX, &ms).unwrap());
    }

    fn collection_with_sheet(store: &GraphStore) -> (Resource, Resource, Resource) {
        let coll = iri("http://example.org/ead/collection").unwrap();
        let owner = iri("http://viaf.org/viaf/39398205").unwrap();
        let ms = groupsheet(store, CTX);
        store.insert(CTX, &coll, rdf::TYPE, &term_of(arch::COLLECTION)).unwrap();
        store.insert(CTX, &coll, schema::CREATOR, &term(&owner)).unwrap();
        store.insert(CTX, &coll, schema::MENTIONS, &term(&ms)).unwrap();
        store.insert(CTX, &owner, schema::NAME, &literal("Longley, Michael")).unwrap();
        (coll, owner, ms)
    }

    #[test]
    fn collection_creators_own_and_are_affiliated() {
        let store = GraphStore::in_memory().unwrap();
        let (_, owner, ms) = collection_with_sheet(&store);
        let report = Inferencer::new(&store, &config(Heuristics::default())).run().unwrap();

        assert_eq!(report.ownership, 1);
        assert_eq!(report.affiliations, 1);
        assert_eq!(report.profiles, 1);

        let local = iri("http://bg.example.org/people/michael-longley/").unwrap();
        assert!(store.contains(Scope::Union, &local, schema::OWNS, &term(&ms)).unwrap());
        assert!(store.contains(Scope::Union, &local, schema::AFFILIATION, &term_of(BELFAST_GROUP)).unwrap());
        assert!(store.contains(Scope::Union, &local, crate::vocab::owl::SAME_AS, &term(&owner)).unwrap());
    }

    #[test]
    fn ownership_heuristic_can_be_disabled() {
        let store = GraphStore::in_memory().unwrap();
        let (_, owner, ms) = collection_with_sheet(&store);
        let heuristics = Heuristics {
            ownership: false,
            writes_about: true,
        };
        let report = Inferencer::new(&store, &config(heuristics)).run().unwrap();
        assert_eq!(report.ownership, 0);
        assert!(!store.contains(Scope::Union, &owner, schema::OWNS, &term(&ms)).unwrap());
    }

    #[test]
    fn poem_authors_write_about_mentions() {
        let store = GraphStore::in_memory().unwrap();
        let poem = iri("http://example.org/poems/docker").unwrap();
        let author = iri("http://viaf.org/viaf/109557338").unwrap();
        let place = iri("http://sws.geonames.org/3333223/").unwrap();
        store.insert(CTX, &poem, rdf::TYPE, &term_of(freebase::POEM)).unwrap();
        store.insert(CTX, &poem, dc::CREATOR, &term(&author)).unwrap();
        store.insert(CTX, &poem, schema::MENTIONS, &term(&place)).unwrap();

        let inferencer = Inferencer::new(&store, &config(Heuristics::default()));
        assert_eq!(inferencer.writes_about(CTX).unwrap(), 1);
        assert_eq!(inferencer.writes_about(CTX).unwrap(), 0);
        assert!(store.contains(Scope::Context(CTX), &author, schema::MENTIONS, &term(&place)).unwrap());

        let off = Heuristics {
            ownership: true,
            writes_about: false,
        };
        let report = Inferencer::new(&store, &config(off)).run().unwrap();
        assert_eq!(report.writes_about, 0);
    }
}
