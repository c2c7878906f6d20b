//! Local profile URIs for people connected to the Belfast Group.
//!
//! Group-sheet authors and anyone directly related to the Group get a
//! `people/<slug>/` URI on the local site, built from their name. External
//! identifiers (VIAF, DBpedia) are linked with `owl:sameAs` and every other
//! reference is rewritten to the local URI: graph-wide for URIs, within the
//! current context for blank nodes.

use std::collections::HashMap;
use std::sync::LazyLock;

use oxigraph::model::NamedNodeRef;
use regex::Regex;

use crate::config::PrepConfig;
use crate::graph::{
    GraphStore, Resource, Scope, StoreResult, is_blank, iri, literal, resource_str,
    sort_resources, term,
};
use crate::text::{is_all_caps, normalize_whitespace, slugify};
use crate::vocab::{BELFAST_GROUP_URI, foaf, owl, schema, skos, sparql_prefixes};

use super::{EXEMPT_PREDICATES, is_local, not_local_filter};

static RE_LAST_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?P<last>[^ ]{2,}), (?P<first>[^,( ]{2,}))[.,]?").unwrap());

static RE_FIRST_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?P<first>[^ ]{2,}) (?P<last>[^,( ]{2,}))$").unwrap());

/// Slugs of name variants that must collapse to one profile.
const NAME_CONVERSIONS: &[(&str, &str)] = &[("hugh-t-bredin", "hugh-bredin")];

/// First and last name of a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// `Firstname Lastname`.
    pub fn full(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

fn match_name(re: &Regex, names: &[String]) -> Option<PersonName> {
    names.iter().find_map(|name| {
        let normalized = normalize_whitespace(name);
        let caps = re.captures(&normalized)?;
        let first = caps["first"].to_string();
        let last = caps["last"].to_string();
        // all-caps variants are unreliable
        if is_all_caps(&first) && is_all_caps(&last) {
            return None;
        }
        Some(PersonName { first, last })
    })
}

/// First and last name of `subject`.
///
/// Explicit given/family names win. Otherwise schema.org names, then FOAF
/// names, are matched as `Lastname, Firstname` and then as
/// `Firstname Lastname`; the first usable match is returned.
pub fn person_names(
    store: &GraphStore,
    scope: Scope<'_>,
    subject: &Resource,
) -> StoreResult<Option<PersonName>> {
    let first = store.literal(scope, subject, schema::GIVEN_NAME)?;
    let last = store.literal(scope, subject, schema::FAMILY_NAME)?;
    if let (Some(first), Some(last)) = (first, last) {
        return Ok(Some(PersonName { first, last }));
    }

    let mut names = store.literals(scope, subject, schema::NAME)?;
    names.sort();
    let mut foaf_names = store.literals(scope, subject, foaf::NAME)?;
    foaf_names.sort();
    names.extend(foaf_names);

    Ok(match_name(&RE_LAST_FIRST, &names).or_else(|| match_name(&RE_FIRST_LAST, &names)))
}

/// Local profile URI for a `Firstname Lastname` string.
pub fn local_person_uri(profile_base: &str, full_name: &str) -> String {
    let slug = slugify(full_name);
    let slug = NAME_CONVERSIONS
        .iter()
        .find(|(from, _)| *from == slug)
        .map_or(slug.as_str(), |(_, to)| *to);
    format!("{profile_base}{slug}/")
}

/// What a profile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// Candidates found across all contexts.
    pub people: usize,
    /// Candidates given (or matched to) a local URI.
    pub converted: usize,
    /// Candidates skipped for lack of a usable name.
    pub skipped: usize,
}

/// Generates local profile URIs.
pub struct ProfileUris<'a> {
    store: &'a GraphStore,
    local_base: String,
    profile_base: String,
}

impl<'a> ProfileUris<'a> {
    pub fn new(store: &'a GraphStore, config: &PrepConfig) -> Self {
        Self {
            store,
            local_base: config.local_base(),
            profile_base: config.profile_base(),
        }
    }

    /// Process every context.
    pub fn run(&self) -> StoreResult<ProfileReport> {
        let mut report = ProfileReport::default();
        for ctx in self.store.contexts()? {
            self.process_context(ctx.as_ref(), &mut report)?;
        }
        tracing::info!(
            people = report.people,
            converted = report.converted,
            skipped = report.skipped,
            "generated local profile URIs"
        );
        Ok(report)
    }

    /// Group-sheet authors and people related to the Group in one context,
    /// excluding those already on the local domain.
    pub fn group_people(&self, ctx: NamedNodeRef<'_>) -> StoreResult<Vec<Resource>> {
        let authors = format!(
            "{prefixes}
            SELECT DISTINCT ?person WHERE {{
                GRAPH <{ctx}> {{
                    ?ms rdf:type bg:GroupSheet .
                    ?ms dc:creator ?person
                }}
                {filter}
            }}",
            prefixes = sparql_prefixes(),
            ctx = ctx.as_str(),
            filter = not_local_filter("person", &self.local_base),
        );
        let related = format!(
            "{prefixes}
            SELECT DISTINCT ?person WHERE {{
                GRAPH <{ctx}> {{
                    ?person rdf:type schema:Person .
                    ?person ?rel <{group}>
                }}
                {filter}
            }}",
            prefixes = sparql_prefixes(),
            ctx = ctx.as_str(),
            group = BELFAST_GROUP_URI,
            filter = not_local_filter("person", &self.local_base),
        );

        let mut people = self.store.select_resources(&authors, "person")?;
        for person in self.store.select_resources(&related, "person")? {
            if !people.contains(&person) {
                people.push(person);
            }
        }
        sort_resources(&mut people);
        Ok(people)
    }

    fn process_context(&self, ctx: NamedNodeRef<'_>, report: &mut ProfileReport) -> StoreResult<()> {
        let people = self.group_people(ctx)?;
        if people.is_empty() {
            return Ok(());
        }
        tracing::debug!(context = ctx.as_str(), count = people.len(), "found people");
        report.people += people.len();

        let mut ctx_map = HashMap::new();
        let mut graph_map = HashMap::new();
        for subject in people {
            let local = match self.existing_local(&subject)? {
                Some(local) => local,
                None => match self.convert_to_local_profile(ctx, &subject)? {
                    Some(local) => local,
                    None => {
                        report.skipped += 1;
                        continue;
                    }
                },
            };
            report.converted += 1;
            if local == subject {
                continue;
            }
            if !is_blank(&subject) {
                graph_map.insert(subject.clone(), local.clone());
            }
            ctx_map.insert(subject, local);
        }

        self.store
            .rewrite_identifiers(Scope::Union, &graph_map, &EXEMPT_PREDICATES)?;
        self.store
            .rewrite_identifiers(Scope::Context(ctx), &ctx_map, &EXEMPT_PREDICATES)?;
        Ok(())
    }

    /// A local URI already declared `owl:sameAs` the subject.
    fn existing_local(&self, subject: &Resource) -> StoreResult<Option<Resource>> {
        let mut same = self.store.subjects(Scope::Union, owl::SAME_AS, &term(subject))?;
        sort_resources(&mut same);
        Ok(same.into_iter().find(|r| is_local(r, &self.local_base)))
    }

    /// Mint the local URI for `subject` and describe it in `ctx`.
    ///
    /// Names are looked up in the context first, then the whole graph. The
    /// caller rewrites references; this only adds the label, name parts and
    /// `owl:sameAs` link. Returns `None` when no usable name exists.
    pub fn convert_to_local_profile(
        &self,
        ctx: NamedNodeRef<'_>,
        subject: &Resource,
    ) -> StoreResult<Option<Resource>> {
        let names = match person_names(self.store, Scope::Context(ctx), subject)? {
            Some(names) => names,
            None => match person_names(self.store, Scope::Union, subject)? {
                Some(names) => names,
                None => {
                    tracing::warn!(person = resource_str(subject), "names could not be determined");
                    return Ok(None);
                }
            },
        };

        let full_name = names.full();
        let local = iri(&local_person_uri(&self.profile_base, &full_name))?;
        let descriptive = [
            (skos::PREF_LABEL, literal(full_name.as_str())),
            (schema::GIVEN_NAME, literal(names.first.as_str())),
            (schema::FAMILY_NAME, literal(names.last.as_str())),
        ];
        for (p, o) in &descriptive {
            if !self.store.contains(Scope::Union, &local, *p, o)? {
                self.store.insert(ctx, &local, *p, o)?;
            }
        }

        if !is_blank(subject) && &local != subject {
            self.store.insert(ctx, &local, owl::SAME_AS, &term(subject))?;
        }
        tracing::debug!(person = resource_str(subject), local = resource_str(&local), "local profile");
        Ok(Some(local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{blank, term_of};
    use crate::vocab::{BELFAST_GROUP, bg, dc, rdf};

    const CTX: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://example.org/ead/");

    fn config() -> PrepConfig {
        PrepConfig {
            local_domain: "bg.example.org".into(),
            ..PrepConfig::default()
        }
    }

    fn name_of(store: &GraphStore, s: &Resource) -> Option<(String, String)> {
        person_names(store, Scope::Union, s)
            .unwrap()
            .map(|n| (n.first, n.last))
    }

    #[test]
    fn last_first_names_split() {
        let store = GraphStore::in_memory().unwrap();
        let p = blank();
        store.insert(CTX, &p, schema::NAME, &literal("Hobsbaum, Philip")).unwrap();
        assert_eq!(name_of(&store, &p), Some(("Philip".into(), "Hobsbaum".into())));

        let q = blank();
        store.insert(CTX, &q, schema::NAME, &literal("Schmoe, Joe A.")).unwrap();
        assert_eq!(name_of(&store, &q), Some(("Joe".into(), "Schmoe".into())));
    }

    #[test]
    fn name_sources_in_preference_order() {
        let store = GraphStore::in_memory().unwrap();
        let p = iri("http://example.net/people/joe-schmoe").unwrap();
        store.insert(CTX, &p, schema::GIVEN_NAME, &literal("Joe")).unwrap();
        store.insert(CTX, &p, schema::FAMILY_NAME, &literal("Schmoe")).unwrap();
        store.insert(CTX, &p, schema::NAME, &literal("Schmoe, Joe A.")).unwrap();
        store.insert(CTX, &p, foaf::NAME, &literal("McSchmoe, Joe A.")).unwrap();
        assert_eq!(name_of(&store, &p), Some(("Joe".into(), "Schmoe".into())));

        store.remove(CTX, &p, schema::GIVEN_NAME, &literal("Joe")).unwrap();
        store.remove(CTX, &p, schema::FAMILY_NAME, &literal("Schmoe")).unwrap();
        assert_eq!(name_of(&store, &p), Some(("Joe".into(), "Schmoe".into())));

        store.remove(CTX, &p, schema::NAME, &literal("Schmoe, Joe A.")).unwrap();
        assert_eq!(name_of(&store, &p), Some(("Joe".into(), "McSchmoe".into())));

        store.remove(CTX, &p, foaf::NAME, &literal("McSchmoe, Joe A.")).unwrap();
        assert_eq!(name_of(&store, &p), None);
    }

    #[test]
    fn all_caps_and_first_last_forms() {
        let store = GraphStore::in_memory().unwrap();
        let p = blank();
        store.insert(CTX, &p, foaf::NAME, &literal("HEANEY, SEAMUS")).unwrap();
        store.insert(CTX, &p, foaf::NAME, &literal("Seamus Heaney")).unwrap();
        assert_eq!(name_of(&store, &p), Some(("Seamus".into(), "Heaney".into())));

        let caps_only = blank();
        store.insert(CTX, &caps_only, schema::NAME, &literal("HEANEY, SEAMUS")).unwrap();
        assert_eq!(name_of(&store, &caps_only), None);
    }

    #[test]
    fn local_uris_use_slug_and_corrections() {
        let base = "http://bg.example.org/people/";
        assert_eq!(local_person_uri(base, "Ciarán Carson"), "http://bg.example.org/people/ciaran-carson/");
        assert_eq!(local_person_uri(base, "Hugh T. Bredin"), "http://bg.example.org/people/hugh-bredin/");
    }

    #[test]
    fn authors_get_local_profiles() {
        let store = GraphStore::in_memory().unwrap();
        let cfg = config();
        let viaf = iri("http://viaf.org/viaf/91907300").unwrap();
        let anon = blank();
        let ms = blank();
        let ms2 = blank();
        store.insert(CTX, &ms, rdf::TYPE, &term_of(bg::GROUP_SHEET)).unwrap();
        store.insert(CTX, &ms, dc::CREATOR, &term(&viaf)).unwrap();
        store.insert(CTX, &viaf, schema::NAME, &literal("Hobsbaum, Philip")).unwrap();
        store.insert(CTX, &ms2, rdf::TYPE, &term_of(bg::GROUP_SHEET)).unwrap();
        store.insert(CTX, &ms2, dc::CREATOR, &term(&anon)).unwrap();
        store.insert(CTX, &anon, schema::NAME, &literal("Bond")).unwrap();

        let report = ProfileUris::new(&store, &cfg).run().unwrap();
        assert_eq!(report, ProfileReport { people: 2, converted: 1, skipped: 1 });

        let local = iri("http://bg.example.org/people/philip-hobsbaum/").unwrap();
        assert_eq!(store.value(Scope::Union, &ms, dc::CREATOR).unwrap(), Some(term(&local)));
        assert_eq!(store.value(Scope::Union, &local, owl::SAME_AS).unwrap(), Some(term(&viaf)));
        assert_eq!(
            store.literal(Scope::Union, &local, skos::PREF_LABEL).unwrap().as_deref(),
            Some("Philip Hobsbaum")
        );
        // skipped candidate keeps its blank node
        assert_eq!(store.value(Scope::Union, &ms2, dc::CREATOR).unwrap(), Some(term(&anon)));
    }

    #[test]
    fn group_members_are_candidates_and_reruns_are_stable() {
        let store = GraphStore::in_memory().unwrap();
        let cfg = config();
        let viaf = iri("http://viaf.org/viaf/39398205").unwrap();
        store.insert(CTX, &viaf, rdf::TYPE, &term_of(schema::PERSON)).unwrap();
        store.insert(CTX, &viaf, schema::AFFILIATION, &term_of(BELFAST_GROUP)).unwrap();
        store.insert(CTX, &viaf, schema::NAME, &literal("Michael Longley")).unwrap();

        let profiles = ProfileUris::new(&store, &cfg);
        profiles.run().unwrap();
        let len = store.len().unwrap();
        let again = profiles.run().unwrap();

        assert_eq!(again.people, 0);
        assert_eq!(store.len().unwrap(), len);
        let local = iri("http://bg.example.org/people/michael-longley/").unwrap();
        assert!(store.contains(Scope::Union, &local, rdf::TYPE, &term_of(schema::PERSON)).unwrap());
    }
}
