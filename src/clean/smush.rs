//! Group-sheet entity resolution ("smushing").
//!
//! The same Group sheet is described by several archives, each with its own
//! blank node or URI. Every copy gets a content-derived identifier: the MD5
//! of the author key and the sorted, slugified titles, under the local
//! `groupsheets/md5/` namespace. Distinct untitled sheets by the same author
//! in one context would collapse to one identifier, so repeats within a
//! context get a letter suffix (`-a`, `-b`, ...).
//!
//! Identifiers are stable across runs: a sheet that already carries one
//! keeps it, and a creator rewritten to a local profile is keyed on the
//! external identity the profile was minted from.

use std::collections::{HashMap, HashSet};

use oxigraph::model::{NamedNode, NamedNodeRef, Term};

use crate::config::PrepConfig;
use crate::graph::{
    GraphStore, Resource, Scope, StoreResult, as_literal, as_resource, is_blank, iri, literal,
    resource_str, sort_resources,
};
use crate::text::{normalize_whitespace, slugify};
use crate::vocab::{bg, dc, owl, rdf, schema};

use super::EXEMPT_PREDICATES;

/// Author string used when a sheet has no creator.
pub const ANONYMOUS: &str = "anonymous";

/// What a smush pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmushReport {
    /// Contexts that held at least one Group sheet.
    pub contexts: usize,
    pub groupsheets: usize,
    /// Quads whose subject or object was replaced.
    pub rewritten: usize,
}

/// MD5 of the author key and the sorted titles.
pub fn base_identifier(author: &str, sorted_titles: &[String]) -> String {
    let text = format!("{author} {}", sorted_titles.join(" "));
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Letter suffix for the n-th repeat: `a`..`z`, then `aa`, `ab`, ...
pub fn suffix(mut n: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Assigns content-derived identifiers to Group sheets.
pub struct Smusher<'a> {
    store: &'a GraphStore,
    namespace: String,
    /// Namespace of local person profiles, resolved back to external ids.
    profile_base: Option<String>,
    /// Identifiers already handed out, per context.
    assigned: HashMap<NamedNode, HashSet<String>>,
}

impl<'a> Smusher<'a> {
    pub fn new(store: &'a GraphStore, config: &PrepConfig) -> Self {
        Self::with_namespace(store, config.groupsheet_md5_base()).with_profile_base(config.profile_base())
    }

    pub fn with_namespace(store: &'a GraphStore, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            profile_base: None,
            assigned: HashMap::new(),
        }
    }

    pub fn with_profile_base(mut self, profile_base: impl Into<String>) -> Self {
        self.profile_base = Some(profile_base.into());
        self
    }

    /// Smush every context.
    pub fn run(&mut self) -> StoreResult<SmushReport> {
        let mut report = SmushReport::default();
        for ctx in self.store.contexts()? {
            let (sheets, rewritten) = self.process_context(ctx.as_ref())?;
            if sheets > 0 {
                report.contexts += 1;
            }
            report.groupsheets += sheets;
            report.rewritten += rewritten;
        }
        tracing::info!(
            groupsheets = report.groupsheets,
            contexts = report.contexts,
            rewritten = report.rewritten,
            "smushed Group sheets"
        );
        Ok(report)
    }

    /// Smush one context. Returns the number of sheets and of rewritten quads.
    pub fn process_context(&mut self, ctx: NamedNodeRef<'_>) -> StoreResult<(usize, usize)> {
        let mut sheets = self.store.instances_of(Scope::Context(ctx), bg::GROUP_SHEET)?;
        if sheets.is_empty() {
            return Ok((0, 0));
        }
        sort_resources(&mut sheets);
        tracing::debug!(context = ctx.as_str(), count = sheets.len(), "smushing Group sheets");

        let mut bases = Vec::with_capacity(sheets.len());
        for ms in &sheets {
            let titles = self.titles(ctx, ms)?;
            let author = self.author_key(ctx, ms)?;
            tracing::debug!(sheet = resource_str(ms), ?author, ?titles, "smush key");
            bases.push(base_identifier(author.as_deref().unwrap_or(ANONYMOUS), &titles));
        }

        let assigned = self.assigned.entry(ctx.into_owned()).or_default();

        // Sheets already carrying an identifier keep it.
        let mut pending = Vec::new();
        for (ms, base) in sheets.iter().zip(&bases) {
            match existing_identifier(&self.namespace, ms) {
                Some(id) => {
                    assigned.insert(id);
                }
                None => pending.push((ms, base)),
            }
        }

        let mut map = HashMap::new();
        for (ms, base) in pending {
            let mut id = base.clone();
            let mut n = 0;
            while assigned.contains(&id) {
                id = format!("{base}-{}", suffix(n));
                n += 1;
            }
            assigned.insert(id.clone());
            map.insert(ms.clone(), iri(&format!("{}{id}", self.namespace))?);
        }

        let rewritten = self
            .store
            .rewrite_identifiers(Scope::Context(ctx), &map, &EXEMPT_PREDICATES)?;
        Ok((sheets.len(), rewritten))
    }

    /// Slugified, sorted titles of a sheet. Literal titles and list members
    /// with irregular whitespace are normalized in the store.
    pub fn titles(&self, ctx: NamedNodeRef<'_>, ms: &Resource) -> StoreResult<Vec<String>> {
        let scope = Scope::Context(ctx);
        let mut titles = Vec::new();
        for title in self.store.objects(scope, ms, dc::TITLE)? {
            if let Some(lit) = as_literal(&title) {
                let normalized = normalize_whitespace(lit.value());
                if normalized != lit.value() {
                    tracing::debug!(from = lit.value(), to = %normalized, "normalizing title");
                    self.store.remove(ctx, ms, dc::TITLE, &title)?;
                    self.store.insert(ctx, ms, dc::TITLE, &literal(normalized.as_str()))?;
                }
                titles.push(normalized);
            } else if let Some(head) = as_resource(&title) {
                for item in self.store.resource_list(scope, &head)? {
                    let Some(lit) = as_literal(&item) else {
                        continue;
                    };
                    let normalized = normalize_whitespace(lit.value());
                    if normalized != lit.value() {
                        self.replace_list_member(ctx, &item, &normalized)?;
                    }
                    titles.push(normalized);
                }
            }
        }
        let mut slugs: Vec<String> = titles.iter().map(|t| slugify(t)).collect();
        slugs.sort();
        Ok(slugs)
    }

    fn replace_list_member(&self, ctx: NamedNodeRef<'_>, old: &Term, new: &str) -> StoreResult<()> {
        let cells = self
            .store
            .quads(Scope::Context(ctx), None, Some(rdf::FIRST), Some(old))?;
        if let Some(cell) = cells.first() {
            self.store.set(ctx, &cell.subject, rdf::FIRST, &literal(new))?;
        }
        Ok(())
    }

    /// Stable author string: the creator URI, or a `Lastname, Firstname`
    /// form built from a blank-node author's names. Local profile URIs are
    /// replaced by the identity they were minted from.
    ///
    /// Co-authored sheets use the lowest key so the result does not depend
    /// on store order.
    pub fn author_key(&self, ctx: NamedNodeRef<'_>, ms: &Resource) -> StoreResult<Option<String>> {
        let mut keys = Vec::new();
        for creator in self.store.objects(Scope::Context(ctx), ms, dc::CREATOR)? {
            let key = match (as_resource(&creator), as_literal(&creator)) {
                (Some(author), _) if is_blank(&author) => self.blank_author_key(ctx, &author)?,
                (Some(author), _) if self.is_profile(&author) => Some(self.profile_author_key(&author)?),
                (Some(author), _) => Some(resource_str(&author).to_string()),
                (None, Some(lit)) => Some(normalize_whitespace(lit.value())),
                (None, None) => None,
            };
            keys.extend(key);
        }
        keys.sort();
        Ok(keys.into_iter().next())
    }

    fn is_profile(&self, resource: &Resource) -> bool {
        self.profile_base
            .as_deref()
            .is_some_and(|base| !is_blank(resource) && resource_str(resource).starts_with(base))
    }

    /// The external identifier linked by `owl:sameAs` (VIAF first), else the
    /// profile's own name parts, else the profile URI.
    fn profile_author_key(&self, profile: &Resource) -> StoreResult<String> {
        let mut external: Vec<Resource> = self
            .store
            .objects(Scope::Union, profile, owl::SAME_AS)?
            .iter()
            .filter_map(as_resource)
            .filter(|r| !is_blank(r) && !self.is_profile(r))
            .collect();
        sort_resources(&mut external);
        let viaf = external.iter().find(|r| resource_str(r).contains("viaf.org"));
        if let Some(id) = viaf.or(external.first()) {
            return Ok(resource_str(id).to_string());
        }

        let last = self.store.literal(Scope::Union, profile, schema::FAMILY_NAME)?;
        let first = self.store.literal(Scope::Union, profile, schema::GIVEN_NAME)?;
        Ok(match (last, first) {
            (Some(last), Some(first)) => normalize_whitespace(&format!("{last}, {first}")),
            _ => resource_str(profile).to_string(),
        })
    }

    fn blank_author_key(&self, ctx: NamedNodeRef<'_>, author: &Resource) -> StoreResult<Option<String>> {
        let scope = Scope::Context(ctx);
        let last = self.store.literal(scope, author, schema::FAMILY_NAME)?;
        let first = self.store.literal(scope, author, schema::GIVEN_NAME)?;
        if let (Some(last), Some(first)) = (last, first) {
            return Ok(Some(normalize_whitespace(&format!("{last}, {first}"))));
        }

        let mut names = self.store.literals(scope, author, schema::NAME)?;
        names.sort();
        if let Some(name) = names.iter().find(|n| n.contains(',')) {
            return Ok(Some(normalize_whitespace(name)));
        }
        let Some(name) = names.first() else {
            tracing::warn!(author = resource_str(author), "Group sheet author has no name");
            return Ok(None);
        };
        let normalized = normalize_whitespace(name);
        Ok(Some(match normalized.rsplit_once(' ') {
            Some((first, last)) => format!("{last}, {first}"),
            None => format!("{normalized}, "),
        }))
    }
}

/// The identifier a sheet already has: an MD5 digest under `namespace`,
/// optionally with a letter suffix.
fn existing_identifier(namespace: &str, ms: &Resource) -> Option<String> {
    if is_blank(ms) {
        return None;
    }
    let id = resource_str(ms).strip_prefix(namespace)?;
    let (digest, rest) = id.split_at_checked(32)?;
    let hex = digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    let suffixed = rest.is_empty()
        || rest
            .strip_prefix('-')
            .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase()));
    (hex && suffixed).then(|| id.to_string())
}
