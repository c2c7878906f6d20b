//! Converter for the Queen's University Belfast (QUB) collection description.
//!
//! The QUB Belfast Group papers (MS 1204) are only described by a static
//! HTML page: a heading, an `#about` paragraph, and one `<div>` per
//! manuscript. Each div starts with the author's name as
//! `Lastname, Firstname`, carries italicized titles, a typescript/page note,
//! and ends with a date line (`Dated DD/MM/YYYY`, `Dates ... YYYY` or
//! `Undated`). A co-author, when present, is named on a later line.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use oxigraph::model::NamedNodeRef;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::QubError;
use crate::graph::{GraphStore, Resource, blank, iri, literal, named, term, term_of};
use crate::vocab::{BELFAST_GROUP_URI, arch, bg, bibo, dc, dcmitype, rdf, schema};

pub type QubResult<T> = std::result::Result<T, QubError>;

/// Identifier of the QUB Belfast Group collection. Also the context the
/// converted data is stored in.
pub const QUB_COLLECTION_URI: &str = "http://www.qub.ac.uk/directorates/InformationServices/TheLibrary/FileStore/Filetoupload,312673,en.pdf";

pub const QUB_COLLECTION: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(QUB_COLLECTION_URI);

static RE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<last>[A-Z][a-zA-Z]+), (?P<first>[A-Za-z. ]+)").unwrap());

static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Dated (?P<day>\d{2})/(?P<month>\d{2})/(?P<year>\d{4})").unwrap());

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Dates [^\d]*(?P<year>\d{4})").unwrap());

static RE_PAGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Typescripts?,? (?P<num>\d)(p|pp.)").unwrap());

static RE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" ?\([^()]+\)").unwrap());

/// Known VIAF identifiers for names as they appear in the collection description.
const NAME_URIS: &[(&str, &str)] = &[
    ("Terry, Arthur", "http://viaf.org/viaf/2490119"),
    ("Hobsbaum, Philip", "http://viaf.org/viaf/91907300"),
    ("Heaney, Seamus", "http://viaf.org/viaf/109557338"),
    ("Pakenham, John", "http://viaf.org/viaf/40930958"),
    ("Bredin, Hugh T.", "http://viaf.org/viaf/94376522"),
    ("Buller, Norman", "http://viaf.org/viaf/29058137"),
    ("McEldowney, Eugene", "http://viaf.org/viaf/18143404"),
    ("Longley, Michael", "http://viaf.org/viaf/39398205"),
    ("Dugdale, Norman", "http://viaf.org/viaf/50609413"),
    ("Simmons, James", "http://viaf.org/viaf/92591927"),
    ("Parker, Stewart", "http://viaf.org/viaf/7497547"),
    ("MacLaverty, Bernard", "http://viaf.org/viaf/95151565"),
    ("Belfast Group", BELFAST_GROUP_URI),
];

/// VIAF URI for a `Lastname, Firstname` key, if known.
pub fn known_uri(name_key: &str) -> Option<&'static str> {
    NAME_URIS
        .iter()
        .find(|(key, _)| *key == name_key)
        .map(|(_, uri)| *uri)
}

/// What a conversion produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QubReport {
    pub manuscripts: usize,
    pub authors: usize,
}

/// Author parsed from a name line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedName {
    first: String,
    last: String,
}

impl ParsedName {
    fn key(&self) -> String {
        format!("{}, {}", self.last, self.first)
    }

    fn full(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

fn parse_name(line: &str) -> Option<ParsedName> {
    let caps = RE_NAME.captures(line)?;
    let last = caps["last"].trim();
    // "Typescript, pp" looks like a name
    if last.eq_ignore_ascii_case("typescript") {
        return None;
    }
    Some(ParsedName {
        first: caps["first"].trim().to_string(),
        last: last.to_string(),
    })
}

/// Date from the final line of an entry, as `YYYY-MM-DD` or `YYYY`.
fn parse_date(last_line: &str) -> Option<String> {
    if last_line.contains("Undated") {
        return None;
    }
    if let Some(caps) = RE_DATE.captures(last_line) {
        return Some(format!("{}-{}-{}", &caps["year"], &caps["month"], &caps["day"]));
    }
    RE_YEAR
        .captures(last_line)
        .map(|caps| caps["year"].to_string())
}

/// Remove parenthetical subtitles, dedications and "(sic)", including nested ones.
fn strip_parentheticals(title: &str) -> String {
    let mut title = title.to_string();
    while title.contains('(') {
        let next = RE_PAREN.replace_all(&title, "").into_owned();
        if next == title {
            break;
        }
        title = next;
    }
    title
}

fn genre(first_line: &str, text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if first_line.to_lowercase().contains("poem") {
        Some("poetry")
    } else if text.contains("short story") || text.contains("short stories") {
        Some("short story")
    } else {
        None
    }
}

fn stripped_strings<'a>(el: &ElementRef<'a>) -> Vec<&'a str> {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn selector(css: &str) -> QubResult<Selector> {
    Selector::parse(css).map_err(|e| QubError::Structure {
        message: format!("invalid selector {css}: {e}"),
    })
}

/// Converts the QUB collection description into RDF.
pub struct QubConverter<'a> {
    store: &'a GraphStore,
}

impl<'a> QubConverter<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Read and convert the HTML file at `path`.
    pub fn convert_file(&self, path: &Path) -> QubResult<QubReport> {
        let html = std::fs::read_to_string(path).map_err(|source| QubError::Read {
            path: path.display().to_string(),
            source,
        })?;
        self.convert(&html)
    }

    /// Convert an HTML document, replacing any earlier conversion.
    pub fn convert(&self, html: &str) -> QubResult<QubReport> {
        let doc = Html::parse_document(html);
        let ctx = QUB_COLLECTION;

        if self.store.context_len(ctx)? > 0 {
            tracing::debug!(context = ctx.as_str(), "replacing existing QUB context");
            self.store.remove_context(ctx)?;
        }

        let coll = named(QUB_COLLECTION);
        self.describe_collection(&doc, &coll)?;

        let div_sel = selector("div")?;
        let i_sel = selector("i")?;
        let mut report = QubReport::default();
        let mut authors = HashSet::new();

        for div in doc.select(&div_sel) {
            if div.value().id() == Some("about") {
                continue;
            }
            let lines = stripped_strings(&div);
            let (Some(first_line), Some(last_line)) = (lines.first(), lines.last()) else {
                continue;
            };
            let text: String = div.text().collect();

            let ms = blank();
            self.store.insert(ctx, &coll, schema::MENTIONS, &term(&ms))?;
            self.store.insert(ctx, &ms, rdf::TYPE, &term_of(bibo::MANUSCRIPT))?;
            self.store.insert(ctx, &ms, rdf::TYPE, &term_of(bg::GROUP_SHEET))?;
            report.manuscripts += 1;

            for name in lines.iter().filter_map(|line| parse_name(line)) {
                let author = self.add_author(&name)?;
                self.store.insert(ctx, &ms, dc::CREATOR, &term(&author))?;
                tracing::debug!(author = %name.full(), "QUB author");
                authors.insert(name.full());
            }

            if let Some(date) = parse_date(last_line) {
                self.store.insert(ctx, &ms, dc::DATE, &literal(date))?;
            }

            if let Some(g) = genre(first_line, &text) {
                self.store.insert(ctx, &ms, schema::GENRE, &literal(g))?;
            }

            if let Some(caps) = RE_PAGES.captures(&text) {
                self.store.insert(ctx, &ms, bibo::NUM_PAGES, &literal(&caps["num"]))?;
            }

            let titles: Vec<String> = div
                .select(&i_sel)
                .flat_map(|i| stripped_strings(&i))
                .map(strip_parentheticals)
                .collect();
            match titles.as_slice() {
                [] => {}
                [title] => {
                    self.store.insert(ctx, &ms, dc::TITLE, &literal(title.as_str()))?;
                }
                many => {
                    let items: Vec<_> = many.iter().map(|t| literal(t.as_str())).collect();
                    let head = self.store.write_list(ctx, &items)?;
                    self.store.insert(ctx, &ms, dc::TITLE, &term(&head))?;
                }
            }
        }

        report.authors = authors.len();
        tracing::info!(
            manuscripts = report.manuscripts,
            authors = report.authors,
            "identified QUB manuscripts"
        );
        Ok(report)
    }

    fn describe_collection(&self, doc: &Html, coll: &Resource) -> QubResult<()> {
        let ctx = QUB_COLLECTION;
        for t in [arch::COLLECTION, schema::CREATIVE_WORK, dcmitype::COLLECTION] {
            self.store.insert(ctx, coll, rdf::TYPE, &term_of(t))?;
        }

        let heading = doc
            .select(&selector("h1")?)
            .next()
            .map(|h| h.text().collect::<String>().trim().to_string())
            .ok_or_else(|| QubError::Structure {
                message: "no <h1> collection title".into(),
            })?;
        self.store.insert(ctx, coll, schema::NAME, &literal(heading))?;

        if let Some(about) = doc.select(&selector("#about")?).next() {
            let text = about.text().collect::<String>().trim().to_string();
            self.store.insert(ctx, coll, schema::DESCRIPTION, &literal(text))?;
        } else {
            tracing::warn!("QUB description has no #about section");
        }

        self.store.insert(ctx, coll, schema::ABOUT, &term(&iri(BELFAST_GROUP_URI)?))?;
        if let Some(hobsbaum) = known_uri("Hobsbaum, Philip") {
            self.store.insert(ctx, coll, schema::CREATOR, &term(&iri(hobsbaum)?))?;
        }
        Ok(())
    }

    fn add_author(&self, name: &ParsedName) -> QubResult<Resource> {
        let ctx = QUB_COLLECTION;
        let author = match known_uri(&name.key()) {
            Some(uri) => iri(uri)?,
            None => blank(),
        };
        self.store.insert(ctx, &author, rdf::TYPE, &term_of(schema::PERSON))?;
        self.store.insert(ctx, &author, schema::NAME, &literal(name.full()))?;
        self.store.insert(ctx, &author, schema::FAMILY_NAME, &literal(name.last.as_str()))?;
        self.store.insert(ctx, &author, schema::GIVEN_NAME, &literal(name.first.as_str()))?;
        Ok(author)
    }
}
