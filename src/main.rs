//! belfast-rdf CLI: prepare the Belfast Group RDF data and network.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use miette::Result;

use belfast_rdf::config::PrepConfig;
use belfast_rdf::graph::GraphStore;
use belfast_rdf::harvest::UreqFetcher;
use belfast_rdf::pipeline::{Pipeline, Stage};

/// Harvest, clean and project the Belfast Group data. With no stage flags,
/// every stage runs.
#[derive(Parser)]
#[command(name = "belfast-rdf", version, about = "Prepare Belfast Group RDF data")]
struct Cli {
    /// Harvest RDFa from finding aids and local fixtures.
    #[arg(short = 'H', long)]
    harvest: bool,

    /// Convert the QUB collection description.
    #[arg(short, long)]
    queens: bool,

    /// Identify Group sheets.
    #[arg(short, long)]
    identify: bool,

    /// Smush Group sheets and mint local profile URIs.
    #[arg(short, long)]
    smush: bool,

    /// Annotate people and places from VIAF, DBpedia and GeoNames.
    #[arg(short, long)]
    related: bool,

    /// Infer connections.
    #[arg(short, long)]
    connect: bool,

    /// Write the network as GEXF.
    #[arg(short, long)]
    gexf: bool,

    /// Destroy and recreate the store before running.
    #[arg(short = 'x', long)]
    clear: bool,

    /// Bypass HTTP caches instead of sending conditional requests.
    #[arg(long)]
    no_cache: bool,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store directory, overriding the configuration.
    #[arg(long)]
    store: Option<PathBuf>,

    /// More logging (repeat for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn stages(&self) -> Vec<Stage> {
        [
            (self.harvest, Stage::Harvest),
            (self.queens, Stage::Queens),
            (self.identify, Stage::Identify),
            (self.smush, Stage::Smush),
            (self.related, Stage::Related),
            (self.connect, Stage::Connect),
            (self.gexf, Stage::Gexf),
        ]
        .into_iter()
        .filter_map(|(on, stage)| on.then_some(stage))
        .collect()
    }

    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            _ => "trace",
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let level = cli.log_level();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => PrepConfig::load(path)?,
        None => PrepConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    config.no_cache |= cli.no_cache;

    let store = if cli.clear {
        tracing::info!(path = %config.store_path.display(), "clearing store");
        GraphStore::destroy_and_recreate(&config.store_path)?
    } else {
        GraphStore::open(&config.store_path)?
    };

    let fetcher = UreqFetcher::new(Duration::from_secs(config.http_timeout_secs));
    let report = Pipeline::new(&store, &config, &fetcher).run(&cli.stages())?;

    println!("{report}");
    println!("store: {} triples", store.len()?);
    Ok(())
}
