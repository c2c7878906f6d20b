//! RDFa extraction from HTML pages using the `scraper` crate.
//!
//! Implements the part of RDFa 1.1 Core that finding-aid and site pages
//! rely on: `vocab`, `prefix` (and legacy `xmlns:` declarations), `about`,
//! `resource`, `href`, `src`, `typeof`, `property`, `rel`, `rev`, `content`,
//! `datatype` and `lang`. Hanging `rel`/`rev` predicates are completed by the
//! first descendant that establishes a subject. Property copying, lists and
//! XML literals are not supported.

use std::collections::HashMap;

use oxigraph::model::{BlankNode, Literal, NamedNode, Term, Triple};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::HarvestError;
use crate::graph::{Resource, term};
use crate::vocab::{arch, bibo, dc, dcmitype, foaf, geo, owl, rdf, schema, skos};

use super::HarvestResult;

/// Prefixes available without declaration (a subset of the RDFa initial context).
const INITIAL_PREFIXES: &[(&str, &str)] = &[
    ("arch", arch::NS),
    ("bibo", bibo::NS),
    ("dc", dc::NS),
    ("dcterms", dc::NS),
    ("dcmitype", dcmitype::NS),
    ("foaf", foaf::NS),
    ("geo", geo::NS),
    ("owl", owl::NS),
    ("rdf", rdf::NS),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("schema", schema::NS),
    ("skos", skos::NS),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Extract every RDFa triple from an HTML document fetched from `base_url`.
pub fn extract(html: &str, base_url: &str) -> HarvestResult<Vec<Triple>> {
    let parse_err = |message: String| HarvestError::Parse {
        url: base_url.to_string(),
        message,
    };
    let mut base = Url::parse(base_url).map_err(|e| parse_err(e.to_string()))?;
    let document = Html::parse_document(html);

    // <base href> overrides the retrieval URL for relative references.
    if let Ok(sel) = Selector::parse("base[href]") {
        if let Some(href) = document.select(&sel).next().and_then(|el| el.value().attr("href")) {
            if let Ok(resolved) = base.join(href) {
                base = resolved;
            }
        }
    }
    let base_node: Resource = NamedNode::new(base.as_str())
        .map_err(|e| parse_err(e.to_string()))?
        .into();

    let context = EvalContext {
        parent_subject: base_node.clone(),
        parent_object: base_node,
        incomplete: Vec::new(),
        vocab: None,
        prefixes: INITIAL_PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect(),
        lang: None,
    };
    let mut extractor = Extractor {
        base,
        blanks: HashMap::new(),
        triples: Vec::new(),
    };
    extractor.process(document.root_element(), &context, true);
    Ok(extractor.triples)
}

#[derive(Clone)]
struct Incomplete {
    predicate: NamedNode,
    reverse: bool,
}

/// Values inherited from ancestors while walking the DOM.
#[derive(Clone)]
struct EvalContext {
    parent_subject: Resource,
    parent_object: Resource,
    incomplete: Vec<Incomplete>,
    vocab: Option<String>,
    prefixes: HashMap<String, String>,
    lang: Option<String>,
}

struct Extractor {
    base: Url,
    blanks: HashMap<String, BlankNode>,
    triples: Vec<Triple>,
}

impl Extractor {
    fn process(&mut self, el: ElementRef<'_>, ctx: &EvalContext, is_root: bool) {
        let attrs = el.value();
        let mut local = ctx.clone();

        if let Some(vocab) = attrs.attr("vocab") {
            let vocab = vocab.trim();
            local.vocab = (!vocab.is_empty()).then(|| vocab.to_string());
        }
        for (name, value) in attrs.attrs() {
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                local.prefixes.insert(prefix.to_ascii_lowercase(), value.trim().to_string());
            }
        }
        if let Some(mappings) = attrs.attr("prefix") {
            let tokens: Vec<&str> = mappings.split_whitespace().collect();
            for pair in tokens.chunks(2) {
                if let [prefix, ns] = pair {
                    if let Some(prefix) = prefix.strip_suffix(':') {
                        local.prefixes.insert(prefix.to_ascii_lowercase(), ns.to_string());
                    }
                }
            }
        }
        if let Some(lang) = attrs.attr("lang").or_else(|| attrs.attr("xml:lang")) {
            local.lang = (!lang.is_empty()).then(|| lang.to_string());
        }

        let rel = self.predicates(attrs.attr("rel"), &local);
        let rev = self.predicates(attrs.attr("rev"), &local);
        let property = self.predicates(attrs.attr("property"), &local);
        let types = self.predicates(attrs.attr("typeof"), &local);
        let has_typeof = attrs.attr("typeof").is_some();
        let about = attrs.attr("about").and_then(|v| self.safe_curie_or_iri(v, &local));
        let resource = attrs
            .attr("resource")
            .and_then(|v| self.safe_curie_or_iri(v, &local))
            .or_else(|| attrs.attr("href").and_then(|v| self.iri(v)))
            .or_else(|| attrs.attr("src").and_then(|v| self.iri(v)));
        let literal_only = attrs.attr("content").is_some() || attrs.attr("datatype").is_some();
        let base_node = is_root.then(|| ctx.parent_subject.clone());

        let mut skip = false;
        let mut current_object = None;
        let mut typed = None;
        let subject;

        if rel.is_empty() && rev.is_empty() {
            if !property.is_empty() && !literal_only {
                subject = about
                    .clone()
                    .or(base_node)
                    .unwrap_or_else(|| ctx.parent_object.clone());
                if has_typeof {
                    typed = match &about {
                        Some(about) => Some(about.clone()),
                        None => {
                            let node = resource.clone().unwrap_or_else(|| self.fresh());
                            current_object = Some(node.clone());
                            Some(node)
                        }
                    };
                }
            } else {
                subject = match about.clone().or(resource.clone()).or(base_node) {
                    Some(node) => node,
                    None if has_typeof => self.fresh(),
                    None => {
                        skip = property.is_empty();
                        ctx.parent_object.clone()
                    }
                };
                if has_typeof {
                    typed = Some(subject.clone());
                }
            }
        } else {
            subject = about
                .clone()
                .or(base_node)
                .unwrap_or_else(|| ctx.parent_object.clone());
            if has_typeof && about.is_some() {
                typed = Some(subject.clone());
            }
            current_object = match resource.clone() {
                Some(node) => Some(node),
                None if has_typeof && about.is_none() => Some(self.fresh()),
                None => None,
            };
            if has_typeof && about.is_none() {
                typed = current_object.clone();
            }
        }

        if let Some(typed) = &typed {
            for class in types {
                self.emit(typed.clone(), rdf::TYPE.into_owned(), Term::NamedNode(class));
            }
        }

        let mut incomplete = Vec::new();
        if let Some(object) = current_object.clone() {
            for p in &rel {
                self.emit(subject.clone(), p.clone(), term(&object));
            }
            for p in &rev {
                self.emit(object.clone(), p.clone(), term(&subject));
            }
        } else if !rel.is_empty() || !rev.is_empty() {
            // Hanging: completed by the first descendant with a subject.
            incomplete.extend(rel.iter().map(|p| Incomplete {
                predicate: p.clone(),
                reverse: false,
            }));
            incomplete.extend(rev.iter().map(|p| Incomplete {
                predicate: p.clone(),
                reverse: true,
            }));
            current_object = Some(self.fresh());
        }

        if !property.is_empty() {
            let value = self.property_value(el, &local, &rel, &rev, &resource, &about, &typed);
            for p in property {
                self.emit(subject.clone(), p, value.clone());
            }
        }

        if !skip {
            for pending in &ctx.incomplete {
                if pending.reverse {
                    self.emit(subject.clone(), pending.predicate.clone(), term(&ctx.parent_subject));
                } else {
                    self.emit(ctx.parent_subject.clone(), pending.predicate.clone(), term(&subject));
                }
            }
        }

        let child_ctx = if skip {
            EvalContext {
                parent_subject: ctx.parent_subject.clone(),
                parent_object: ctx.parent_object.clone(),
                incomplete: ctx.incomplete.clone(),
                ..local
            }
        } else {
            EvalContext {
                parent_object: current_object.unwrap_or_else(|| subject.clone()),
                parent_subject: subject,
                incomplete,
                ..local
            }
        };
        for child in el.children().filter_map(ElementRef::wrap) {
            self.process(child, &child_ctx, false);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn property_value(
        &mut self,
        el: ElementRef<'_>,
        ctx: &EvalContext,
        rel: &[NamedNode],
        rev: &[NamedNode],
        resource: &Option<Resource>,
        about: &Option<Resource>,
        typed: &Option<Resource>,
    ) -> Term {
        let attrs = el.value();
        let datatype = attrs
            .attr("datatype")
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| self.expand(d.trim(), ctx))
            .and_then(|d| NamedNode::new(d).ok());

        let lexical = match attrs.attr("content") {
            Some(content) => content.to_string(),
            None => {
                if datatype.is_none() && attrs.attr("datatype").is_none() && rel.is_empty() && rev.is_empty() {
                    if let Some(node) = resource {
                        return term(node);
                    }
                    if about.is_none() {
                        if let Some(node) = typed {
                            return term(node);
                        }
                    }
                }
                el.text().collect::<String>()
            }
        };

        match (datatype, &ctx.lang) {
            (Some(dt), _) => Literal::new_typed_literal(lexical, dt).into(),
            (None, Some(lang)) => Literal::new_language_tagged_literal(lexical.clone(), lang)
                .unwrap_or_else(|_| Literal::new_simple_literal(lexical))
                .into(),
            (None, None) => Literal::new_simple_literal(lexical).into(),
        }
    }

    /// Expand the whitespace-separated terms, CURIEs and IRIs of an attribute.
    fn predicates(&self, value: Option<&str>, ctx: &EvalContext) -> Vec<NamedNode> {
        value
            .map(|v| {
                v.split_whitespace()
                    .filter_map(|token| self.expand(token, ctx))
                    .filter_map(|iri| NamedNode::new(iri).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn expand(&self, token: &str, ctx: &EvalContext) -> Option<String> {
        if let Some((prefix, reference)) = token.split_once(':') {
            if prefix == "_" {
                return None;
            }
            if let Some(ns) = ctx.prefixes.get(&prefix.to_ascii_lowercase()) {
                return Some(format!("{ns}{reference}"));
            }
            return Url::parse(token).ok().map(|u| u.to_string());
        }
        ctx.vocab.as_ref().map(|vocab| format!("{vocab}{token}"))
    }

    fn safe_curie_or_iri(&mut self, value: &str, ctx: &EvalContext) -> Option<Resource> {
        let value = value.trim();
        let (value, safe) = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            Some(inner) => (inner, true),
            None => (value, false),
        };
        if let Some(label) = value.strip_prefix("_:") {
            return Some(self.labelled_blank(label));
        }
        if let Some((prefix, reference)) = value.split_once(':') {
            if let Some(ns) = ctx.prefixes.get(&prefix.to_ascii_lowercase()) {
                return NamedNode::new(format!("{ns}{reference}")).ok().map(Into::into);
            }
        }
        if safe {
            return None;
        }
        self.iri(value)
    }

    fn iri(&self, value: &str) -> Option<Resource> {
        let resolved = self.base.join(value.trim()).ok()?;
        NamedNode::new(resolved.as_str()).ok().map(Into::into)
    }

    fn labelled_blank(&mut self, label: &str) -> Resource {
        self.blanks
            .entry(label.to_string())
            .or_default()
            .clone()
            .into()
    }

    fn fresh(&self) -> Resource {
        BlankNode::default().into()
    }

    fn emit(&mut self, subject: Resource, predicate: NamedNode, object: Term) {
        self.triples.push(Triple::new(subject, predicate, object));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{iri, literal, term_of};

    fn has(triples: &[Triple], s: &Resource, p: &str, o: &Term) -> bool {
        triples
            .iter()
            .any(|t| &t.subject == s && t.predicate.as_str() == p && &t.object == o)
    }

    #[test]
    fn vocab_typeof_property_and_rel() {
        let html = r#"<html><body vocab="http://schema.org/">
            <div about="http://example.org/page/" typeof="WebPage">
              <span property="name">Example page</span>
              <a rel="relatedLink" href="/other/">other</a>
            </div>
        </body></html>"#;
        let triples = extract(html, "http://example.org/page/").unwrap();
        let page = iri("http://example.org/page/").unwrap();

        assert!(has(&triples, &page, rdf::TYPE.as_str(), &term_of(schema::WEB_PAGE)));
        assert!(has(&triples, &page, schema::NAME.as_str(), &literal("Example page")));
        assert!(has(
            &triples,
            &page,
            schema::RELATED_LINK.as_str(),
            &term(&iri("http://example.org/other/").unwrap())
        ));
    }

    #[test]
    fn typeof_without_about_creates_blank_subject() {
        let html = r#"<html><body vocab="http://schema.org/">
            <div typeof="Person"><span property="name">Philip Hobsbaum</span></div>
        </body></html>"#;
        let triples = extract(html, "http://example.org/").unwrap();
        let person = triples
            .iter()
            .find(|t| t.predicate == rdf::TYPE && t.object == term_of(schema::PERSON))
            .map(|t| t.subject.clone())
            .unwrap();

        assert!(matches!(person, Resource::BlankNode(_)));
        assert!(has(&triples, &person, schema::NAME.as_str(), &literal("Philip Hobsbaum")));
    }

    #[test]
    fn hanging_rel_is_completed_by_descendant() {
        let html = r#"<html><body>
            <div about="http://example.org/coll/" rel="dc:hasPart">
              <div about="http://example.org/coll/series1/">
                <span property="dc:title">Series 1</span>
              </div>
            </div>
        </body></html>"#;
        let triples = extract(html, "http://example.org/coll/").unwrap();
        let coll = iri("http://example.org/coll/").unwrap();
        let series = iri("http://example.org/coll/series1/").unwrap();

        assert!(has(&triples, &coll, dc::HAS_PART.as_str(), &term(&series)));
        assert!(has(&triples, &series, dc::TITLE.as_str(), &literal("Series 1")));
    }

    #[test]
    fn prefix_attribute_and_content_override() {
        let html = r#"<html prefix="ex: http://example.org/ns#"><body>
            <p about="_:a" property="ex:date" content="1966-03-30">30 March 1966</p>
            <p about="_:a" property="ex:label">Label</p>
        </body></html>"#;
        let triples = extract(html, "http://example.org/").unwrap();
        let dated: Vec<_> = triples
            .iter()
            .filter(|t| t.predicate.as_str() == "http://example.org/ns#date")
            .collect();
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].object, literal("1966-03-30"));

        // Same label, same blank node.
        let labelled = triples
            .iter()
            .find(|t| t.predicate.as_str() == "http://example.org/ns#label")
            .unwrap();
        assert_eq!(labelled.subject, dated[0].subject);
    }

    #[test]
    fn plain_html_yields_nothing() {
        let html = "<html><head><link rel=\"stylesheet\" href=\"s.css\"></head>\
                    <body><p>No data here.</p></body></html>";
        assert!(extract(html, "http://example.org/").unwrap().is_empty());
    }

    #[test]
    fn invalid_base_is_a_parse_error() {
        let err = extract("<html></html>", "not a url").unwrap_err();
        assert!(matches!(err, HarvestError::Parse { .. }));
    }
}
