//! # skyconf
//!
//! CLI entry point for the node API conformance harness.
//!
//! ## Commands
//! - `run`: execute every registered case matrix plus the consistency
//!   pass against the configured node
//! - `list`: print the registered cases without touching the network
//!
//! ## Environment Variables
//! - `TESTMODE`: `stable` (golden files) or `live` (structural checks)
//! - `COIN`: coin name, informational (default: skycoin)
//! - `USE_CSRF`: fetch and attach CSRF tokens on protected calls
//! - `NODE_HOST`: node base URL (default: http://localhost:6420)
//! - `LIVE_DISABLE_NETWORKING`: live mode expects zero peers
//! - `STABLE_SKIP_SLOW`: stable mode skips slow network-dependent cases
//! - `GOLDEN_DIR`: golden fixture directory (default: golden)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use skyconf_client::ApiClient;
use skyconf_harness::case::Expectation;
use skyconf_harness::csrf::CsrfSession;
use skyconf_harness::golden::GoldenStore;
use skyconf_harness::{suites, Configuration, Runner};

#[derive(Parser)]
#[command(name = "skyconf", version, about = "Node HTTP API conformance harness")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all case matrices and consistency checks against the node
    Run {
        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Run only the matrix with this name (e.g. "block"),
        /// skipping the cross-endpoint consistency pass
        #[arg(long)]
        matrix: Option<String>,
    },
    /// List registered cases without executing anything
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run { json, matrix } => run(json, matrix).await,
        Commands::List => {
            list();
            Ok(())
        }
    }
}

async fn run(json: bool, only_matrix: Option<String>) -> Result<()> {
    let config = Configuration::from_env().context("loading configuration")?;
    info!(
        mode = %config.mode,
        coin = %config.coin,
        node = %config.node_host,
        use_csrf = config.use_csrf,
        "starting conformance run"
    );

    let client = ApiClient::new(&config.node_host).context("building API client")?;
    let golden = GoldenStore::new(&config.golden_dir);
    let csrf = CsrfSession::new(client.clone());
    let runner = Runner::new(&client, &golden, &csrf, &config);

    let mut matrices = suites::all();
    if let Some(name) = &only_matrix {
        matrices.retain(|m| m.name == name);
        anyhow::ensure!(!matrices.is_empty(), "no matrix named '{}'", name);
    }

    // A scoped run executes exactly the requested matrix; the
    // consistency pass belongs to full runs only.
    let report = if only_matrix.is_some() {
        runner.run_matrices(&matrices).await
    } else {
        runner.run_all(&matrices).await
    };
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        );
    } else {
        print!("{}", report);
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn list() {
    for matrix in suites::all() {
        println!("{}:", matrix.name);
        for case in &matrix.cases {
            let kind = match &case.expected {
                Expectation::Success { golden_key } => format!("success -> {}", golden_key),
                Expectation::Failure { code, .. } => format!("failure {}", code),
            };
            let slow = if case.slow { " [slow]" } else { "" };
            println!("  {} ({}){}", case.name, kind, slow);
        }
    }
}
