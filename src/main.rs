//! edld - External Dynamic List daemon.
//!
//! Serves firewall-consumable blocklists over HTTP and manages their
//! contents through a REST API and an MCP tool interface.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edld::config::Config;
use edld::http::{AppState, router};
use edld::service::{edl, seed};
use edld::store::Store;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_LOG_FILTER: &str = "edld=info,tower_http=warn";

#[derive(Parser)]
#[command(name = "edld", version, about = "External Dynamic List daemon")]
struct Cli {
    /// Path to edld.toml (default: ~/.edld/edld.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP daemon
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
        /// Use an in-memory database (data is lost on exit)
        #[arg(long)]
        ephemeral: bool,
        /// Emit logs as JSON
        #[arg(long)]
        log_json: bool,
    },
    /// Print a list's EDL body to stdout
    Render {
        /// List slug
        slug: String,
    },
    /// Seed the built-in exclusion rules and exit
    Seed,
    /// Generate shell completions
    Completions {
        /// Shell to generate for
        shell: Shell,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn open_store(config: &Config) -> Result<Store> {
    let path = config.database_path();
    Store::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            bind,
            ephemeral,
            log_json,
        } => {
            init_logging(log_json);
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let validation = config.validate()?;
            for warning in &validation.warnings {
                warn!("{warning}");
            }
            serve(config, ephemeral).await
        }
        Commands::Render { slug } => {
            init_logging(false);
            let config = Config::load_or_default(cli.config.as_deref())?;
            let store = open_store(&config)?;
            match edl::render(&store, &slug)? {
                Some(body) => {
                    print!("{body}");
                    Ok(())
                }
                None => anyhow::bail!("list '{slug}' not found"),
            }
        }
        Commands::Seed => {
            init_logging(false);
            let config = Config::load_or_default(cli.config.as_deref())?;
            let store = open_store(&config)?;
            let inserted = seed::seed_builtin_exclusions(&store)?;
            if inserted == 0 {
                println!("built-in exclusions already present");
            } else {
                println!("seeded {inserted} built-in exclusions");
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "edld", &mut io::stdout());
            Ok(())
        }
    }
}

async fn serve(config: Config, ephemeral: bool) -> Result<()> {
    let store = if ephemeral {
        warn!("running with an in-memory database; data is lost on exit");
        Store::memory()?
    } else {
        open_store(&config)?
    };
    seed::seed_builtin_exclusions(&store)?;

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let state = AppState {
        store,
        config: std::sync::Arc::new(config),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "edld listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
