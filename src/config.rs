//! Pipeline configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for the Belfast Group site.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Default domain for locally minted identifiers.
pub const DEFAULT_DOMAIN: &str = "belfastgroup.digitalscholarship.emory.edu";

/// Base URL of the Emory finding-aid site.
pub const FINDING_AID_BASE: &str = "http://findingaids.library.emory.edu/documents/";

/// Public DBpedia SPARQL endpoint.
pub const DBPEDIA_ENDPOINT: &str = "http://dbpedia.org/sparql";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Directory of the persistent RDF store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Host used for local profile and group-sheet identifiers.
    #[serde(default = "default_local_domain")]
    pub local_domain: String,
    /// Network output files.
    #[serde(default)]
    pub gexf: GexfConfig,
    /// EAD identifiers of finding aids to harvest.
    #[serde(default = "default_finding_aid_ids")]
    pub finding_aid_ids: Vec<String>,
    /// Identifiers of digitized TEI group sheets on the local site.
    #[serde(default = "default_tei_ids")]
    pub tei_ids: Vec<String>,
    /// Local HTML+RDFa files loaded alongside the harvest.
    #[serde(default = "default_local_fixtures")]
    pub local_fixtures: Vec<PathBuf>,
    /// HTML rendering of the QUB collection description.
    #[serde(default = "default_qub_input")]
    pub qub_input: PathBuf,
    /// Follow `hasPart` and `relatedLink` links while harvesting.
    #[serde(default = "default_true")]
    pub find_related: bool,
    /// Ask servers to bypass caches instead of sending conditional requests.
    #[serde(default)]
    pub no_cache: bool,
    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// SPARQL endpoint queried for DBpedia descriptions.
    #[serde(default = "default_dbpedia_endpoint")]
    pub dbpedia_endpoint: String,
    /// Toggles for the less certain inference rules.
    #[serde(default)]
    pub heuristics: Heuristics,
    /// Radius of the Belfast Group ego network.
    #[serde(default = "default_ego_radius")]
    pub ego_radius: usize,
    /// Nodes with fewer connections are dropped from the ego network.
    #[serde(default = "default_ego_min_degree")]
    pub ego_min_degree: usize,
}

/// Where the projected networks are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexfConfig {
    #[serde(default = "default_gexf_full")]
    pub full: PathBuf,
    #[serde(default = "default_gexf_group")]
    pub group: PathBuf,
}

/// Inference rules that rest on assumptions about the collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Heuristics {
    /// A sheet in a person's collection that they did not author was owned by them.
    #[serde(default = "default_true")]
    pub ownership: bool,
    /// A person described by a group sheet was written about by its author.
    #[serde(default = "default_true")]
    pub writes_about: bool,
}

fn default_true() -> bool {
    true
}

fn default_dbpedia_endpoint() -> String {
    DBPEDIA_ENDPOINT.to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/rdf")
}

fn default_local_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_gexf_full() -> PathBuf {
    PathBuf::from("data/belfastgroup.gexf")
}

fn default_gexf_group() -> PathBuf {
    PathBuf::from("data/belfastgroup-group.gexf")
}

fn default_finding_aid_ids() -> Vec<String> {
    [
        "longley744",
        "ormsby805",
        "irishmisc794",
        "carson746",
        "heaney960",
        "heaney653",
        "muldoon784",
        "simmons759",
        "hobsbaum1013",
        "mahon689",
        "fallon817",
        "grennan1150",
        "heaney-hammond1019",
        "hughes644",
        "mcbreen1088",
        "monteith789",
        "deane1210",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_tei_ids() -> Vec<String> {
    [
        "longley1_10244",
        "longley1_10353",
        "heaney1_10407",
        "carson1_1035",
        "longley1_10202",
        "heaney1_10415",
        "heaney1_10365",
        "heaney1_10163",
        "heaney1_10199",
        "heaney1_10236",
        "heaney1_10269",
        "longley1_1042",
        "heaney1_10442",
        "hobsbaum1_1040",
        "heaney1_10116",
        "heaney1_1078",
        "heaney1_1041",
        "muldoon2_10121",
        "muldoon2_1079",
        "muldoon2_1040",
        "longley1_10120",
        "longley1_10158",
        "longley1_1079",
        "longley1_10282",
        "longley1_10316",
        "simmons1_1035",
        "simmons1_1069",
        "hobsbaum1_1047",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_local_fixtures() -> Vec<PathBuf> {
    [
        "data/BelfastGroup_biographies.html",
        "data/ednalongley_bio.html",
        "data/pakenham_privatecoll.html",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

fn default_qub_input() -> PathBuf {
    PathBuf::from("data/QUB_ms1204.html")
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_ego_radius() -> usize {
    1
}

fn default_ego_min_degree() -> usize {
    1
}

impl Default for GexfConfig {
    fn default() -> Self {
        Self {
            full: default_gexf_full(),
            group: default_gexf_group(),
        }
    }
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            ownership: true,
            writes_about: true,
        }
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            local_domain: default_local_domain(),
            gexf: GexfConfig::default(),
            finding_aid_ids: default_finding_aid_ids(),
            tei_ids: default_tei_ids(),
            local_fixtures: default_local_fixtures(),
            qub_input: default_qub_input(),
            find_related: true,
            no_cache: false,
            http_timeout_secs: default_http_timeout_secs(),
            dbpedia_endpoint: default_dbpedia_endpoint(),
            heuristics: Heuristics::default(),
            ego_radius: default_ego_radius(),
            ego_min_degree: default_ego_min_degree(),
        }
    }
}

impl PrepConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// `http://<local_domain>/`.
    pub fn local_base(&self) -> String {
        format!("http://{}/", self.local_domain)
    }

    /// Namespace of local person profiles.
    pub fn profile_base(&self) -> String {
        format!("{}people/", self.local_base())
    }

    /// Namespace of content-derived group-sheet identifiers.
    pub fn groupsheet_md5_base(&self) -> String {
        format!("{}groupsheets/md5/", self.local_base())
    }

    /// Every URL the harvest stage starts from: finding aids, then TEI group sheets.
    pub fn harvest_seeds(&self) -> Vec<String> {
        let finding_aids = self
            .finding_aid_ids
            .iter()
            .map(|id| format!("{FINDING_AID_BASE}{id}/"));
        let tei = self
            .tei_ids
            .iter()
            .map(|id| format!("{}groupsheets/{id}/", self.local_base()));
        finding_aids.chain(tei).collect()
    }
}
