//! The data-preparation pipeline: stages run in a fixed order over one store.
//!
//! Each stage reads what earlier stages left in the store and writes its
//! results back, so any suffix of the pipeline can be re-run on its own.

use std::fmt;

use crate::clean::{Identifier, InferReport, Inferencer, ProfileReport, ProfileUris, SmushReport, Smusher};
use crate::config::PrepConfig;
use crate::error::PrepResult;
use crate::graph::{GraphStore, named};
use crate::harvest::{AnnotateReport, Annotator, Fetcher, HarvestOptions, HarvestStats, Harvester, LocalRdf};
use crate::network::project::node_id;
use crate::network::{Projector, ego_graph, min_degree, write_gexf_file};
use crate::qub::{QubConverter, QubReport};
use crate::vocab::BELFAST_GROUP;

/// Node types kept in the Belfast Group ego network.
pub const GROUP_NETWORK_TYPES: &[&str] = &["Person", "Organization"];

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Harvest RDFa from finding aids and local fixtures.
    Harvest,
    /// Convert the QUB collection description.
    Queens,
    /// Type Group sheets.
    Identify,
    /// Merge duplicate Group sheets and mint local profile URIs.
    Smush,
    /// Annotate people and places from VIAF, DBpedia and GeoNames.
    Related,
    /// Infer periods, ownership and affiliations.
    Connect,
    /// Project the network and write GEXF.
    Gexf,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Harvest,
        Stage::Queens,
        Stage::Identify,
        Stage::Smush,
        Stage::Related,
        Stage::Connect,
        Stage::Gexf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Harvest => "harvest",
            Stage::Queens => "queens",
            Stage::Identify => "identify",
            Stage::Smush => "smush",
            Stage::Related => "related",
            Stage::Connect => "connect",
            Stage::Gexf => "gexf",
        }
    }

    /// The stages to run for a selection: all of them when nothing is
    /// selected, always in pipeline order.
    pub fn plan(selected: &[Stage]) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| selected.is_empty() || selected.contains(s))
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sizes of the written networks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edges: usize,
    pub group_nodes: usize,
    pub group_edges: usize,
}

/// What each stage that ran did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub local_triples: usize,
    pub harvest: Option<HarvestStats>,
    pub qub: Option<QubReport>,
    pub identified: Option<usize>,
    pub smush: Option<SmushReport>,
    pub profiles: Option<ProfileReport>,
    pub related: Option<AnnotateReport>,
    pub connect: Option<InferReport>,
    pub network: Option<NetworkSummary>,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(h) = &self.harvest {
            writeln!(
                f,
                "harvest: {} of {} urls, {} unmodified, {} errors, {} local triples",
                h.harvested, h.total, h.unmodified, h.errors, self.local_triples
            )?;
        }
        if let Some(q) = &self.qub {
            writeln!(f, "queens: {} manuscripts, {} authors", q.manuscripts, q.authors)?;
        }
        if let Some(n) = self.identified {
            writeln!(f, "identify: {n} group sheets typed")?;
        }
        if let Some(s) = &self.smush {
            writeln!(
                f,
                "smush: {} group sheets in {} contexts, {} quads rewritten",
                s.groupsheets, s.contexts, s.rewritten
            )?;
        }
        if let Some(p) = &self.profiles {
            writeln!(
                f,
                "profiles: {} people, {} local, {} skipped",
                p.people, p.converted, p.skipped
            )?;
        }
        if let Some(r) = &self.related {
            writeln!(
                f,
                "related: {} places, {} viaf, {} dbpedia, {} failures",
                r.places, r.viaf_people, r.dbpedia_people, r.failures
            )?;
        }
        if let Some(c) = &self.connect {
            writeln!(
                f,
                "connect: {} coverage, {} owners, {} writes-about, {} affiliations",
                c.coverage, c.ownership, c.writes_about, c.affiliations
            )?;
        }
        if let Some(n) = &self.network {
            writeln!(
                f,
                "gexf: {} nodes / {} edges, group {} nodes / {} edges",
                n.nodes, n.edges, n.group_nodes, n.group_edges
            )?;
        }
        Ok(())
    }
}

/// Runs stages against one store.
pub struct Pipeline<'a> {
    store: &'a GraphStore,
    config: &'a PrepConfig,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a GraphStore, config: &'a PrepConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            store,
            config,
            fetcher,
        }
    }

    /// Run the selected stages (all when empty) in pipeline order.
    pub fn run(&self, selected: &[Stage]) -> PrepResult<PipelineReport> {
        let mut report = PipelineReport::default();
        for stage in Stage::plan(selected) {
            let span = tracing::info_span!("stage", %stage);
            let _enter = span.enter();
            tracing::info!("starting");
            self.run_stage(stage, &mut report)?;
        }
        Ok(report)
    }

    fn run_stage(&self, stage: Stage, report: &mut PipelineReport) -> PrepResult<()> {
        let (store, config) = (self.store, self.config);
        match stage {
            Stage::Harvest => {
                report.local_triples = LocalRdf::new(store).load_files(&config.local_fixtures);
                let options = HarvestOptions {
                    find_related: config.find_related,
                    no_cache: config.no_cache,
                };
                let mut harvester = Harvester::new(store, self.fetcher, options);
                report.harvest = Some(harvester.run(&config.harvest_seeds()));
            }
            Stage::Queens => match QubConverter::new(store).convert_file(&config.qub_input) {
                Ok(qub) => report.qub = Some(qub),
                Err(e) => tracing::error!(
                    path = %config.qub_input.display(),
                    error = %e,
                    "QUB conversion failed, skipping"
                ),
            },
            Stage::Identify => report.identified = Some(Identifier::new(store).run()?),
            Stage::Smush => {
                report.smush = Some(Smusher::new(store, config).run()?);
                report.profiles = Some(ProfileUris::new(store, config).run()?);
            }
            Stage::Related => {
                report.related = Some(Annotator::new(store, self.fetcher, config).run()?);
            }
            Stage::Connect => report.connect = Some(Inferencer::new(store, config).run()?),
            Stage::Gexf => report.network = Some(self.write_networks()?),
        }
        Ok(())
    }

    /// Write the full network and the Belfast Group ego network.
    fn write_networks(&self) -> PrepResult<NetworkSummary> {
        let network = Projector::new(self.store).project()?;
        write_gexf_file(&network, &self.config.gexf.full)?;
        let mut summary = NetworkSummary {
            nodes: network.node_count(),
            edges: network.edge_count(),
            ..Default::default()
        };

        let group = node_id(&named(BELFAST_GROUP));
        if network.contains(&group) {
            let ego = ego_graph(
                &network,
                &group,
                self.config.ego_radius,
                Some(GROUP_NETWORK_TYPES),
            )?;
            let ego = min_degree(&ego, self.config.ego_min_degree);
            write_gexf_file(&ego, &self.config.gexf.group)?;
            summary.group_nodes = ego.node_count();
            summary.group_edges = ego.edge_count();
        } else {
            tracing::warn!(group = %group, "Belfast Group not in network, no group GEXF written");
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_runs_everything_in_order() {
        assert_eq!(Stage::plan(&[]), Stage::ALL.to_vec());
        assert_eq!(
            Stage::plan(&[Stage::Gexf, Stage::Identify]),
            vec![Stage::Identify, Stage::Gexf]
        );
    }

    #[test]
    fn report_lists_only_stages_that_ran() {
        let report = PipelineReport {
            identified: Some(3),
            ..Default::default()
        };
        assert_eq!(report.to_string(), "identify: 3 group sheets typed\n");
    }
}
