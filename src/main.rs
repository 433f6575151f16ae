//! Clinical ground-truth CLI.
//! `harvest` pulls FDA / ClinicalTrials.gov updates into a dataset; `generate`, `load` and
//! `extract-events` work on what was harvested.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clinical_ground_truth::config::{HarvestSettings, SourceCatalog};
use clinical_ground_truth::corpus::{self, CorpusOptions, OutputMode};
use clinical_ground_truth::harvest::fetch::HttpFetcher;
use clinical_ground_truth::load::{load_folder, LocalWarehouse};
use clinical_ground_truth::{events, init_tracing, Orchestrator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clinical-ground-truth", version, about)]
struct Cli {
    /// Settings file (overrides $CGT_CONFIG_PATH and config/harvest.toml).
    #[arg(long, global = true, env = "CGT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest all sources into a new timestamped dataset.
    Harvest {
        /// Append the demo scenarios regardless of how much was harvested.
        #[arg(long)]
        force_demo: bool,
    },
    /// Render back-dated clinical documents from the harvested datasets.
    Generate(GenerateArgs),
    /// Load datasets and corpus metadata into warehouse tables.
    Load(LoadArgs),
    /// Flatten an openFDA drug-event JSON dump to CSV.
    ExtractEvents {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value_t = 100)]
    num_documents: usize,
    #[arg(long, default_value_t = 5)]
    years: u32,
    #[arg(long, default_value = "local")]
    output_mode: OutputMode,
    /// Overrides the configured corpus directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Fixed seed for reproducible corpora.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct LoadArgs {
    #[arg(long)]
    project_id: String,
    #[arg(long, default_value = "clinical_knowledge_integrity")]
    dataset_id: String,
    /// Warehouse root directory.
    #[arg(long, default_value = "warehouse")]
    location: PathBuf,
    #[arg(long, default_value = "data")]
    data_folder: PathBuf,
}

fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = HarvestSettings::resolve(cli.config.as_deref())?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    match cli.command {
        Command::Harvest { force_demo } => {
            let fetcher = HttpFetcher::new().context("initializing HTTP client")?;
            let orchestrator = Orchestrator::from_catalog(settings, &SourceCatalog::builtin(), Box::new(fetcher));
            let report = rt.block_on(orchestrator.run(force_demo))?;
            println!("Harvest complete");
            println!("{report}");
        }
        Command::Generate(args) => {
            let opts = CorpusOptions {
                num_documents: args.num_documents,
                years: args.years,
                ground_truth_dir: settings.output_dir.clone(),
                output_dir: args.output_dir.unwrap_or_else(|| settings.corpus_dir.clone()),
                mode: args.output_mode,
            };
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let today = chrono::Local::now().date_naive();
            let stats = corpus::generate(&opts, today, &mut rng)?;
            println!("Corpus written to {}", opts.output_dir.display());
            println!("{stats}");
        }
        Command::Load(args) => {
            let sink = LocalWarehouse::new(&args.location, &args.project_id, &args.dataset_id);
            let in_folder = args.data_folder.join("clinical_document_corpus");
            let corpus_dir = if in_folder.is_dir() { in_folder } else { settings.corpus_dir.clone() };
            let summary = rt.block_on(load_folder(&sink, &args.data_folder, &corpus_dir))?;
            for (table, rows) in &summary.tables {
                println!("  {table:<28} {rows:>6} rows");
            }
            for (table, err) in &summary.failures {
                println!("  {table:<28} FAILED: {err}");
            }
            println!("Warehouse: {}", args.location.join(&args.project_id).join(&args.dataset_id).display());
        }
        Command::ExtractEvents { input, output } => {
            let rows = events::extract_events(&input, &output)?;
            println!("Extracted {rows} reports to {}", output.display());
        }
    }
    Ok(())
}
