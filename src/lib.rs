// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # belfast-rdf
//!
//! Data preparation for the Belfast Group site: harvest RDF about the group,
//! its members and their manuscripts, clean and cross-link it, and project
//! it onto a weighted network for visualization.
//!
//! ## Architecture
//!
//! - **Graph store** (`graph`): oxigraph quad store, one named graph per source document
//! - **Harvest** (`harvest`): RDFa and RDF/XML over HTTP, local fixtures, VIAF/DBpedia/GeoNames
//! - **QUB** (`qub`): the QUB collection description converted from HTML
//! - **Clean** (`clean`): Group-sheet identification, smushing, profile URIs, inference
//! - **Network** (`network`): petgraph projection, ego networks, GEXF output
//! - **Pipeline** (`pipeline`): the stages above in a fixed order
//!
//! ## Library usage
//!
//! ```no_run
//! use belfast_rdf::config::PrepConfig;
//! use belfast_rdf::graph::GraphStore;
//! use belfast_rdf::harvest::UreqFetcher;
//! use belfast_rdf::pipeline::{Pipeline, Stage};
//!
//! let config = PrepConfig::default();
//! let store = GraphStore::open(&config.store_path).unwrap();
//! let fetcher = UreqFetcher::new(std::time::Duration::from_secs(30));
//! let report = Pipeline::new(&store, &config, &fetcher)
//!     .run(&[Stage::Identify, Stage::Smush])
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod clean;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod harvest;
pub mod network;
pub mod pipeline;
pub mod qub;
pub mod text;
pub mod vocab;
