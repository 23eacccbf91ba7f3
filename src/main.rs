//! scholarboard - Google Scholar metrics fetcher and research performance dashboard
//!
//! ## Usage
//!
//! ### Fetch metrics for a roster
//! ```bash
//! scholarboard fetch --input roster.csv --output scholar_metrics_fetched.csv
//! ```
//!
//! ### Dashboard
//! ```bash
//! scholarboard serve --data scholar_metrics_fetched.csv --port 8501
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scholarboard::{
    cookies::CookieManager,
    dashboard::{self, AppState},
    fetcher::{BatchFetcher, RowStatus, DEFAULT_DELAY_SECS},
    gscholar::{ScholarClient, ScholarConfig, DEFAULT_SCHOLAR_URL},
    report::{self, thousands, DashboardView},
    scoring::ScoringConfig,
    store::{CsvStore, RecordStore},
    update::{missing_candidates, update_missing_record},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Roster exported from the submission form
const DEFAULT_INPUT_CSV: &str =
    "Scientist Google Scholar and H-index Data Submission (Responses) - Form responses .csv";

/// Fetched dataset read by the dashboard
const DEFAULT_DATA_CSV: &str = "scholar_metrics_fetched.csv";

// ============================================================================
// CLI Definition
// ============================================================================

/// Google Scholar metrics fetcher and research performance dashboard
#[derive(Parser)]
#[command(name = "scholarboard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Google Scholar connection options
#[derive(Args, Clone)]
struct ScholarArgs {
    /// Proxy URL (e.g., http://127.0.0.1:7890)
    #[arg(long, env = "SCHOLAR_PROXY")]
    proxy: Option<String>,

    /// Mirror site URL
    #[arg(long, env = "SCHOLAR_BASE_URL", default_value = DEFAULT_SCHOLAR_URL)]
    mirror: String,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ScholarArgs {
    fn client(&self) -> Result<ScholarClient> {
        let config = ScholarConfig {
            base_url: self.mirror.clone(),
            proxy: self.proxy.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
            cookie_path: None,
        };
        ScholarClient::new(config).context("Failed to create Google Scholar client")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch h-index and citations for every scientist in a roster
    Fetch {
        /// Roster CSV
        #[arg(short, long, default_value = DEFAULT_INPUT_CSV)]
        input: PathBuf,

        /// Output CSV (roster columns plus fetched metrics)
        #[arg(short, long, default_value = DEFAULT_DATA_CSV)]
        output: PathBuf,

        /// Pause after each lookup, in seconds
        #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
        delay_secs: u64,

        #[command(flatten)]
        scholar: ScholarArgs,
    },

    /// Run the dashboard HTTP server
    Serve {
        /// Fetched dataset CSV
        #[arg(long, default_value = DEFAULT_DATA_CSV)]
        data: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        scholar: ScholarArgs,
    },

    /// Print the dashboard summary to the terminal
    Report {
        /// Fetched dataset CSV
        #[arg(long, default_value = DEFAULT_DATA_CSV)]
        data: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fetch metrics for one scientist that has none and update the dataset
    Update {
        /// Scientist name as it appears in the dataset
        #[arg(long)]
        name: String,

        /// Google Scholar profile link
        #[arg(long)]
        link: String,

        /// Fetched dataset CSV
        #[arg(long, default_value = DEFAULT_DATA_CSV)]
        data: PathBuf,

        #[command(flatten)]
        scholar: ScholarArgs,
    },

    /// Manage cookies
    Cookies {
        #[command(subcommand)]
        action: CookieAction,
    },
}

#[derive(Subcommand)]
enum CookieAction {
    /// Clear stored cookies
    Clear,
    /// Show cookie file path
    Path,
    /// Import cookies exported from a browser (JSON array on stdin)
    Import,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.log_json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Fetch {
            input,
            output,
            delay_secs,
            scholar,
        } => run_fetch(input, output, delay_secs, scholar).await,
        Commands::Serve {
            data,
            port,
            host,
            scholar,
        } => run_server(data, host, port, scholar).await,
        Commands::Report { data, json } => run_report(data, json),
        Commands::Update {
            name,
            link,
            data,
            scholar,
        } => run_update(data, name, link, scholar).await,
        Commands::Cookies { action } => handle_cookies(action),
    }
}

// ============================================================================
// Batch Fetch
// ============================================================================

async fn run_fetch(input: PathBuf, output: PathBuf, delay_secs: u64, scholar: ScholarArgs) -> Result<()> {
    println!("Loading input CSV: {}", input.display());

    let output = CsvStore::new(output);
    let fetcher = BatchFetcher::new(Arc::new(scholar.client()?), Duration::from_secs(delay_secs));
    let report = fetcher
        .fetch_roster(&CsvStore::new(&input), &output)
        .await
        .context("Batch fetch failed")?;

    for (name, status) in &report.rows {
        match status {
            RowStatus::Fetched { hindex, citations } => {
                println!("  ✓ {}: h-index {} | citations {}", name, hindex, citations)
            }
            RowStatus::Failed { reason } => println!("  ✗ {}: {}", name, reason),
            RowStatus::MissingLink => println!("  - {}: invalid or missing Scholar link", name),
        }
    }

    println!(
        "\n✓ Fetching complete: {} fetched, {} failed, {} without link",
        report.fetched(),
        report.failed(),
        report.missing_links()
    );
    println!("Output saved as: {}", output.path().display());
    Ok(())
}

// ============================================================================
// Report
// ============================================================================

fn run_report(data: PathBuf, json: bool) -> Result<()> {
    let mut dataset = CsvStore::new(&data).load().context("Failed to load dataset")?;
    dataset.refresh_scores(&ScoringConfig::default());
    let view = DashboardView::build(&dataset);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let s = &view.summary;
    let fmt_opt = |v: Option<f64>, p: usize| v.map(|v| format!("{:.*}", p, v)).unwrap_or_else(|| "-".to_string());

    println!("Scientists:        {}", s.scientists);
    println!("Avg H-Index:       {}", fmt_opt(s.mean_hindex, 2));
    println!("Total Citations:   {}", thousands(s.total_citations));
    println!("Profiles Fetched:  {:.1}%", s.coverage_pct);
    println!("IIHR Score:        {}", fmt_opt(s.mean_score, 3));

    println!("\nTop {} Scientists by Performance Score", report::LEADERBOARD_SIZE);
    for e in &view.leaderboard {
        println!(
            "{:>3}. {:<40} {:>6} {:>9} {:>7} {}",
            e.rank,
            e.name,
            e.fetched_hindex.map(|v| v.to_string()).unwrap_or_default(),
            e.fetched_citations.map(|v| v.to_string()).unwrap_or_default(),
            fmt_opt(e.performance_score, 3),
            e.category.map(|c| c.as_str()).unwrap_or_default()
        );
    }

    println!("\nPerformance Category Distribution");
    for (label, count) in &view.categories {
        println!("  {:<9} {}", label.as_str(), count);
    }

    println!("\nData Quality");
    println!("  Missing Scholar Links:    {}", view.quality.missing_links);
    println!("  Profiles Without Metrics: {}", view.quality.missing_metrics);

    if missing_candidates(&dataset).is_empty() {
        println!("\nAll scientist profiles are complete.");
    }
    Ok(())
}

// ============================================================================
// Single Record Update
// ============================================================================

async fn run_update(data: PathBuf, name: String, link: String, scholar: ScholarArgs) -> Result<()> {
    let store = CsvStore::new(&data);
    let scoring = ScoringConfig::default();
    let mut dataset = store.load().context("Failed to load dataset")?;
    dataset.refresh_scores(&scoring);

    let client = scholar.client()?;
    let outcome = update_missing_record(&store, &client, &scoring, &mut dataset, &name, &link).await?;

    println!("{}", outcome.message());
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(data: PathBuf, host: String, port: u16, scholar: ScholarArgs) -> Result<()> {
    let store = CsvStore::new(&data);
    // Fail early on a missing or unreadable dataset
    let rows = store.load().context("Failed to load dataset")?.len();
    info!(path = %data.display(), rows, "Dataset loaded");

    let state = Arc::new(AppState {
        store: Arc::new(store),
        lookup: Arc::new(scholar.client()?),
        scoring: ScoringConfig::default(),
    });

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    println!("Starting dashboard at http://{}", addr);
    dashboard::serve(state, addr).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// Cookie Management
// ============================================================================

fn handle_cookies(action: CookieAction) -> Result<()> {
    let manager = CookieManager::new()?;

    match action {
        CookieAction::Clear => {
            manager.clear()?;
            println!("Cookies cleared.");
        }
        CookieAction::Path => {
            println!("Cookie file: {:?}", manager.path());
        }
        CookieAction::Import => {
            println!("Paste cookies exported from https://scholar.google.com as a JSON array, then press Ctrl-D:");
            println!("Format: [{{\"name\":\"NID\",\"value\":\"xxx\",\"domain\":\".google.com\"}},...]");

            let input = std::io::read_to_string(std::io::stdin())?;
            if input.trim().is_empty() {
                println!("No cookies provided.");
                return Ok(());
            }

            let saved = manager
                .import_json(&input)
                .context("Failed to import cookies, expected a JSON array of browser cookies")?;
            println!("Saved {} Google cookies to {:?}", saved, manager.path());
        }
    }

    Ok(())
}
