use crate::api::Api;
use crate::config::ServiceConfig;
use crate::dispatcher::Dispatcher;
use crate::docs::{generate, render_interactive};
use crate::ledger::{build_api, LedgerStore};
use crate::logging;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for schemagate
#[derive(Parser, Debug)]
#[command(name = "schemagate", version)]
#[command(about = "Schema-validated ledger service", long_about = None)]
pub struct Cli {
    /// YAML service configuration
    #[arg(short, long, global = true, env = "SCHEMAGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the ledger API over HTTP
    Serve {
        /// Listen address, overriding the configuration
        #[arg(short, long)]
        addr: Option<String>,

        /// Open the demo accounts Alice, Bob and Charlie at startup
        #[arg(long, default_value_t = false)]
        seed_demo: bool,
    },
    /// Print the generated API description
    Docs {
        #[arg(short, long, value_enum, default_value_t = DocsFormat::Json)]
        format: DocsFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List registered routes
    Routes,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DocsFormat {
    Json,
    Yaml,
    Html,
}

/// Render the description of `api` in `format`.
///
/// # Errors
///
/// Serialisation or template failure.
pub fn render_docs(api: &Api, format: DocsFormat) -> anyhow::Result<String> {
    let description = generate(api);
    match format {
        DocsFormat::Json => description.to_json(),
        DocsFormat::Yaml => description.to_yaml(),
        DocsFormat::Html => render_interactive(&description, None),
    }
}

fn ledger_api(config: &ServiceConfig, store: Arc<LedgerStore>) -> anyhow::Result<Api> {
    build_api(store, config).context("Failed to assemble ledger API")
}

fn serve(config: &ServiceConfig, addr: Option<String>, seed_demo: bool) -> anyhow::Result<()> {
    let _logging = logging::init_logging()?;
    RuntimeConfig::from_env().apply();

    let store = Arc::new(if seed_demo {
        LedgerStore::with_demo_accounts()
    } else {
        LedgerStore::new()
    });
    let api = ledger_api(config, store)?;
    for line in api.routes().dump_routes() {
        info!(route = %line, "Serving route");
    }

    let dispatcher = Dispatcher::with_config(Arc::new(api), config.dispatcher_config());
    let addr = addr.unwrap_or_else(|| config.http.addr.clone());
    let handle = HttpServer(AppService::new(dispatcher))
        .start(addr.as_str())
        .with_context(|| format!("Failed to bind {addr}"))?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}

fn write_output(output: Option<&PathBuf>, contents: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            if !contents.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

/// Parse arguments and run the selected command.
///
/// # Errors
///
/// Configuration, bind, or output failure.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServiceConfig::resolve(cli.config.as_deref())?;
    match cli.command {
        Commands::Serve { addr, seed_demo } => serve(&config, addr, seed_demo),
        Commands::Docs { format, output } => {
            let api = ledger_api(&config, Arc::new(LedgerStore::new()))?;
            write_output(output.as_ref(), &render_docs(&api, format)?)
        }
        Commands::Routes => {
            let api = ledger_api(&config, Arc::new(LedgerStore::new()))?;
            write_output(None, &api.routes().dump_routes().join("\n"))
        }
    }
}
