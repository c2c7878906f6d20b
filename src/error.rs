//! Rich diagnostic error types for the data-preparation pipeline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Errors that only affect
//! a single URL, record, or candidate are logged and counted by the stage that
//! hit them; only errors that make a whole stage meaningless reach the caller.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum PrepError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Harvest(#[from] HarvestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Qub(#[from] QubError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to open RDF store at {path}: {message}")]
    #[diagnostic(
        code(belfast::store::open),
        help(
            "The on-disk store could not be opened. Check that no other process \
             holds it open and that the directory is writable. Use --clear to \
             start from an empty store."
        )
    )]
    Open { path: String, message: String },

    #[error("RDF store operation failed: {message}")]
    #[diagnostic(
        code(belfast::store::storage),
        help(
            "The underlying store reported an error. This may indicate corruption; \
             re-run the pipeline with --clear."
        )
    )]
    Storage { message: String },

    #[error("SPARQL query failed: {message}")]
    #[diagnostic(
        code(belfast::store::sparql),
        help("Check the query syntax and the prefixes it relies on.")
    )]
    Sparql { message: String },

    #[error("failed to load RDF into <{context}>: {message}")]
    #[diagnostic(
        code(belfast::store::load),
        help("The source document is not valid RDF in the declared format.")
    )]
    Load { context: String, message: String },

    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(belfast::store::iri),
        help("Identifiers written to the store must be absolute IRIs.")
    )]
    InvalidIri { iri: String, message: String },

    #[error("I/O error on store directory {path}: {source}")]
    #[diagnostic(
        code(belfast::store::io),
        help("Check that the store directory exists and has correct permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Harvest errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("fetch error for URL \"{url}\": {message}")]
    #[diagnostic(
        code(belfast::harvest::fetch),
        help(
            "Failed to download the URL. Check that the URL is reachable \
             and the network is available."
        )
    )]
    Fetch { url: String, message: String },

    #[error("HTTP {status} for URL \"{url}\"")]
    #[diagnostic(
        code(belfast::harvest::status),
        help("The server refused the request; the URL is skipped for this run.")
    )]
    Status { url: String, status: u16 },

    #[error("redirect from \"{url}\" has no usable Location header")]
    #[diagnostic(
        code(belfast::harvest::redirect),
        help("The server answered with a redirect but did not say where to.")
    )]
    Redirect { url: String },

    #[error("failed to parse RDF from \"{url}\": {message}")]
    #[diagnostic(
        code(belfast::harvest::parse),
        help("The response is not valid RDFa/RDF; the URL is skipped for this run.")
    )]
    Parse { url: String, message: String },

    #[error("failed to read local fixture {path}: {source}")]
    #[diagnostic(
        code(belfast::harvest::fixture),
        help("Check the `local_fixtures` paths in the configuration.")
    )]
    Fixture {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// QUB conversion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QubError {
    #[error("failed to read QUB collection description {path}: {source}")]
    #[diagnostic(
        code(belfast::qub::read),
        help("Check the `qub_input` path in the configuration.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected QUB document structure: {message}")]
    #[diagnostic(
        code(belfast::qub::structure),
        help(
            "The converter expects an <h1> collection title, an element with \
             id=\"about\", and one <div> per manuscript."
        )
    )]
    Structure { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Projection errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("failed to write GEXF to {path}: {source}")]
    #[diagnostic(
        code(belfast::network::write),
        help("Check that the output directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("node not in network: {node}")]
    #[diagnostic(
        code(belfast::network::node_not_found),
        help("The resource has no node in the projected network; regenerate the network first.")
    )]
    NodeNotFound { node: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(belfast::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(belfast::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for functions returning pipeline results.
pub type PrepResult<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_prep_error() {
        let err = StoreError::Sparql {
            message: "bad".into(),
        };
        let prep: PrepError = err.into();
        assert!(matches!(prep, PrepError::Store(StoreError::Sparql { .. })));
    }

    #[test]
    fn harvest_error_wraps_store_error() {
        let err: HarvestError = StoreError::Storage {
            message: "disk".into(),
        }
        .into();
        assert!(matches!(err, HarvestError::Store(StoreError::Storage { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = HarvestError::Status {
            url: "http://example.org/".into(),
            status: 404,
        };
        let msg = format!("{err}");
        assert!(msg.contains("404"));
        assert!(msg.contains("http://example.org/"));
    }
}
