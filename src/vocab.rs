//! RDF vocabularies used throughout the pipeline.
//!
//! Every term is a `NamedNodeRef<'static>` so it can be used directly in
//! store patterns without allocating.

use oxigraph::model::NamedNodeRef;

/// The Belfast Group's VIAF identifier. Not strictly a namespace, but every
/// stage needs it.
pub const BELFAST_GROUP_URI: &str = "http://viaf.org/viaf/123393054";

/// The Belfast Group as a named node.
pub const BELFAST_GROUP: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(BELFAST_GROUP_URI);

macro_rules! vocab {
    ($(#[$meta:meta])* $module:ident, $ns:literal, { $($name:ident => $local:literal),* $(,)? }) => {
        $(#[$meta])*
        pub mod $module {
            use oxigraph::model::NamedNodeRef;

            /// Namespace IRI.
            pub const NS: &str = $ns;

            $(
                pub const $name: NamedNodeRef<'static> =
                    NamedNodeRef::new_unchecked(concat!($ns, $local));
            )*
        }
    };
}

vocab!(
    /// RDF core terms.
    rdf, "http://www.w3.org/1999/02/22-rdf-syntax-ns#", {
        TYPE => "type",
        FIRST => "first",
        REST => "rest",
        NIL => "nil",
    }
);

vocab!(
    /// OWL.
    owl, "http://www.w3.org/2002/07/owl#", {
        SAME_AS => "sameAs",
    }
);

vocab!(
    /// schema.org.
    schema, "http://schema.org/", {
        ABOUT => "about",
        AFFILIATION => "affiliation",
        COLLECTION_PAGE => "CollectionPage",
        CREATIVE_WORK => "CreativeWork",
        CREATOR => "creator",
        DATE_MODIFIED => "dateModified",
        DESCRIPTION => "description",
        FAMILY_NAME => "familyName",
        GENRE => "genre",
        GIVEN_NAME => "givenName",
        HOME_LOCATION => "homeLocation",
        MENTIONS => "mentions",
        NAME => "name",
        ORGANIZATION => "Organization",
        OWNS => "owns",
        PERSON => "Person",
        PLACE => "Place",
        RELATED_LINK => "relatedLink",
        SAME_AS => "sameAs",
        URL => "URL",
        WEB_PAGE => "WebPage",
        WORKS_FOR => "worksFor",
    }
);

vocab!(
    /// Dublin Core terms.
    dc, "http://purl.org/dc/terms/", {
        COVERAGE => "coverage",
        CREATOR => "creator",
        DATE => "date",
        HAS_PART => "hasPart",
        TITLE => "title",
    }
);

vocab!(
    /// DCMI types.
    dcmitype, "http://purl.org/dc/dcmitype/", {
        COLLECTION => "Collection",
    }
);

vocab!(
    /// Bibliographic ontology.
    bibo, "http://purl.org/ontology/bibo/", {
        MANUSCRIPT => "Manuscript",
        NUM_PAGES => "numPages",
    }
);

vocab!(
    /// Archival collections vocabulary.
    arch, "http://purl.org/archival/vocab/arch#", {
        COLLECTION => "Collection",
    }
);

vocab!(
    /// SKOS.
    skos, "http://www.w3.org/2004/02/skos/core#", {
        PREF_LABEL => "prefLabel",
    }
);

vocab!(
    /// FOAF.
    foaf, "http://xmlns.com/foaf/0.1/", {
        NAME => "name",
        KNOWS => "knows",
        IS_PRIMARY_TOPIC_OF => "isPrimaryTopicOf",
    }
);

vocab!(
    /// WGS84 geo positions.
    geo, "http://www.w3.org/2003/01/geo/wgs84_pos#", {
        LAT => "lat",
        LONG => "long",
    }
);

vocab!(
    /// DBpedia ontology.
    dbpedia_owl, "http://dbpedia.org/ontology/", {
        ABSTRACT => "abstract",
    }
);

vocab!(
    /// Freebase book types.
    freebase, "http://www.freebase.com/", {
        POEM => "book/poem",
    }
);

vocab!(
    /// Local Belfast Group ontology.
    bg, "http://belfastgroup.library.emory.edu/ontologies/2013/6/belfastgroup/#", {
        GROUP_SHEET => "GroupSheet",
    }
);

/// Prefix declarations for SPARQL queries issued by the pipeline.
pub fn sparql_prefixes() -> String {
    [
        ("rdf", rdf::NS),
        ("owl", owl::NS),
        ("schema", schema::NS),
        ("dc", dc::NS),
        ("bibo", bibo::NS),
        ("arch", arch::NS),
        ("skos", skos::NS),
        ("foaf", foaf::NS),
        ("bg", bg::NS),
    ]
    .iter()
    .map(|(prefix, ns)| format!("PREFIX {prefix}: <{ns}>\n"))
    .collect()
}
