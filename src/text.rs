//! String normalization shared by the cleaning and projection stages.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static RE_SLUG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

static RE_SLUG_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Trim and collapse every whitespace run into a single space.
pub fn normalize_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Decompose and drop anything that is not ASCII.
///
/// Accented letters keep their base letter (`é` → `e`); characters with no
/// ASCII decomposition disappear.
pub fn ascii_only(s: &str) -> String {
    s.nfkd().filter(char::is_ascii).collect()
}

/// URL slug: ASCII-folded, lowercase, punctuation removed, whitespace and
/// dash runs collapsed to a single `-`.
pub fn slugify(s: &str) -> String {
    let ascii = ascii_only(s);
    let stripped = RE_SLUG_STRIP.replace_all(&ascii, "");
    let lowered = stripped.trim().to_lowercase();
    RE_SLUG_DASH.replace_all(&lowered, "-").into_owned()
}

/// Short name of an IRI: the part after the last `#`, `/` or `:`.
pub fn local_name(iri: &str) -> &str {
    let trimmed = iri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['#', '/', ':']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// True when the string has cased letters and all of them are upper case.
pub fn is_all_caps(s: &str) -> bool {
    let mut cased = s.chars().filter(|c| c.is_lowercase() || c.is_uppercase()).peekable();
    cased.peek().is_some() && cased.all(char::is_uppercase)
}
