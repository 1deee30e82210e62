use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hand_ev::analyser;
use hand_ev::config::AnalyserConfig;
use hand_ev::hand::HandRecord;
use hand_ev::report::Report;
use hand_ev::store::{self, HandStore, JsonDirStore, MemoryStore};
use hand_ev::web;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "hand-ev",
    version,
    about = "Per-decision EV analysis of no-limit hold'em hand histories",
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Analyser configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Monte Carlo seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Monte Carlo run-outs per matchup
    #[arg(long, global = true)]
    samples: Option<u32>,

    /// Rake as a fraction of the pot
    #[arg(long = "rake-percent", global = true)]
    rake_percent: Option<f64>,

    /// Rake cap in chips
    #[arg(long = "rake-cap", global = true)]
    rake_cap: Option<f64>,

    /// Wall-clock budget per decision in milliseconds
    #[arg(long = "deadline-ms", global = true)]
    deadline_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyse the hero decisions of a hand file
    Analyse {
        /// Hand document (JSON)
        file: PathBuf,

        /// Analyse only this betting action
        #[arg(long)]
        action: Option<usize>,

        /// Store the hand and its analyses in this directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Disable ANSI colors in output
        #[arg(long = "no-color", default_value_t = false)]
        no_color: bool,

        /// Print the hand with analyses attached as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the web server
    Serve {
        /// Address to bind (HOST:PORT)
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        /// Persist hands in this directory instead of memory
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = color_eyre::install();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hand_ev=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyse {
            file,
            action,
            store,
            no_color,
            json,
        } => run_analyse(&config, file, action, store, no_color, json),
        Commands::Serve { addr, store } => run_server(config, addr, store).await,
    }
}

fn load_config(cli: &Cli) -> Result<AnalyserConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyserConfig::from_path(path)?,
        None => AnalyserConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(samples) = cli.samples {
        config.samples = samples;
    }
    if let Some(percent) = cli.rake_percent {
        config.rake.percent = percent;
    }
    if let Some(cap) = cli.rake_cap {
        config.rake.cap = Some(cap);
    }
    if let Some(ms) = cli.deadline_ms {
        config.deadline_ms = Some(ms);
    }
    config.check()?;
    Ok(config)
}

fn run_analyse(
    config: &AnalyserConfig,
    file: PathBuf,
    action: Option<usize>,
    store_dir: Option<PathBuf>,
    no_color: bool,
    json: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading hand {}", file.display()))?;
    let mut hand: HandRecord =
        serde_json::from_str(&raw).with_context(|| format!("parsing hand {}", file.display()))?;
    if hand.id.trim().is_empty() {
        hand.id = uuid::Uuid::new_v4().to_string();
    }

    let results = match action {
        Some(index) => vec![(index, analyser::analyse(&hand, index, config))],
        None => analyser::analyse_all(&hand, config),
    };

    let report = Report::new(no_color);
    if !json {
        println!("{}", report.header(&hand));
    }
    let mut failures = 0;
    for (index, result) in results {
        match result {
            Ok(analysis) => {
                if !json {
                    println!("{}", report.decision(&hand, index, &analysis));
                }
                store::attach_analysis(&mut hand, index, analysis)?;
            }
            Err(err) => {
                failures += 1;
                eprintln!("{}", report.failure(index, &err));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&hand)?);
    } else {
        println!("{}", report.stats(&store::player_stats(std::slice::from_ref(&hand))));
    }

    if let Some(dir) = store_dir {
        JsonDirStore::open(&dir)?.save(&hand)?;
    }
    if failures > 0 && action.is_some() {
        anyhow::bail!("decision could not be analysed");
    }
    Ok(())
}

async fn run_server(config: AnalyserConfig, addr: String, store_dir: Option<PathBuf>) -> Result<()> {
    let addr: SocketAddr = addr.parse()?;
    let store: Arc<dyn HandStore> = match store_dir {
        Some(dir) => Arc::new(JsonDirStore::open(dir)?),
        None => Arc::new(MemoryStore::new()),
    };
    web::serve(addr, store, config).await
}
