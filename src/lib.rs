pub mod config;
pub mod dataset;
pub mod model;
pub mod output;
pub mod search;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use config::RosterConfig;
use output::{OutputFormat, render_event, render_results};
use search::{EventStream, SearchStore, Timing};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Debounced live search over a roster of people"
)]
pub struct Cli {
    /// Path to the config file (defaults to platform config dir)
    #[arg(long, env = "ROSTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Quiet period before a query is searched, in milliseconds
    #[arg(long, env = "ROSTER_DEBOUNCE_MS", global = true)]
    pub debounce_ms: Option<u64>,

    /// Simulated lookup latency for non-blank queries, in milliseconds
    #[arg(long, env = "ROSTER_LATENCY_MS", global = true)]
    pub latency_ms: Option<u64>,

    /// How long search state outlives its last observer, in milliseconds
    #[arg(long, env = "ROSTER_LINGER_MS", global = true)]
    pub linger_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one query through the search pipeline and print the settled results
    Search {
        /// Query text; an empty string lists everyone
        query: String,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Print the record set
    Records {
        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Read query edits from stdin, one per line, and print each busy/result transition
    Watch {
        /// Emit one JSON object per transition
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Timing from the config file with command-line overrides applied.
    pub fn timing(&self, config: &RosterConfig) -> Timing {
        let base = config.timing();
        Timing {
            debounce: self
                .debounce_ms
                .map_or(base.debounce, Duration::from_millis),
            filter_latency: self
                .latency_ms
                .map_or(base.filter_latency, Duration::from_millis),
            linger: self.linger_ms.map_or(base.linger, Duration::from_millis),
        }
    }

    fn load_config(&self) -> Result<RosterConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => RosterConfig::config_path()?,
        };
        RosterConfig::load_from(&path)
            .with_context(|| format!("load config from {}", path.display()))
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config()?;
    let timing = cli.timing(&config);
    let store = SearchStore::new(dataset::from_config(&config), timing);
    tracing::debug!(?timing, records = store.records().len(), "store_ready");

    match cli.command {
        Commands::Search { query, json } => {
            run_search(&store, query, OutputFormat::from_json_flag(json)).await
        }
        Commands::Records { json } => {
            let out = render_results(store.records(), None, OutputFormat::from_json_flag(json))?;
            println!("{out}");
            Ok(())
        }
        Commands::Watch { json } => run_watch(&store, OutputFormat::from_json_flag(json)).await,
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_search(store: &SearchStore, query: String, format: OutputFormat) -> Result<()> {
    let results = store
        .search(query.clone())
        .await
        .context("search pipeline stopped before the query resolved")?;
    let out = render_results(&results, Some(&query), format)?;
    if !out.is_empty() {
        println!("{out}");
    }
    Ok(())
}

async fn run_watch(store: &SearchStore, format: OutputFormat) -> Result<()> {
    let mut events = store.observe_events();
    let mut state = store.observe_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("read query from stdin")? {
                Some(text) => store.set_query(text),
                None => break,
            },
            Some(event) = events.next() => print_event(&event, format)?,
        }
    }

    // Input is closed: keep reporting until the final query has resolved.
    let last = store.query();
    loop {
        tokio::select! {
            biased;
            Some(event) = events.next() => print_event(&event, format)?,
            resolved = state.wait_for(|s| s.is_resolved(&last)) => {
                resolved.context("search pipeline stopped before the query resolved")?;
                break;
            }
        }
    }
    drain_events(&mut events, format)
}

fn drain_events(events: &mut EventStream, format: OutputFormat) -> Result<()> {
    while let Some(event) = events.try_next() {
        print_event(&event, format)?;
    }
    Ok(())
}

fn print_event(event: &search::SearchEvent, format: OutputFormat) -> Result<()> {
    println!("{}", render_event(event, format)?);
    Ok(())
}
