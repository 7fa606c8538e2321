use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pg_mcp_guard::config::GuardConfig;
use pg_mcp_guard::db;
use pg_mcp_guard::hooks::HookChain;
use pg_mcp_guard::pipeline::QueryPipeline;
use pg_mcp_guard::server::GuardServer;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP gatekeeper for PostgreSQL — policy-checked, hook-mediated, sanitized
/// access for AI agents
#[derive(Parser)]
#[command(name = "pg-mcp-guard", version, about)]
struct Cli {
    /// Path to the JSON config file (falls back to GOPGMCP_CONFIG_PATH,
    /// then ./gopgmcp.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server over stdio (default)
    Serve,
    /// Write a default config file and print an MCP client snippet
    Configure {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Check config, database connectivity, and hook commands
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = GuardConfig::resolve_path(cli.config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&path).await,
        Command::Configure { force } => configure(&path, force),
        Command::Doctor => doctor(&path).await,
    }
}

async fn serve(path: &Path) -> Result<()> {
    let config = GuardConfig::load(path)?;

    // stdout belongs to the MCP transport; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        config = %path.display(),
        read_only = config.read_only,
        before_hooks = config.server_hooks.before_query.len(),
        after_hooks = config.server_hooks.after_query.len(),
        "starting pg-mcp-guard"
    );

    let pool = db::connect(&config).await?;
    let pipeline = QueryPipeline::new(pool, &config)?;
    let service = GuardServer::new(pipeline, &config)?;

    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}

fn configure(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::write(path, GuardConfig::default_json())
        .with_context(|| format!("cannot write {}", path.display()))?;
    println!("Wrote {}", path.display());
    println!();
    println!("Add the server to your MCP client:");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "mcpServers": {
                "postgres": {
                    "command": "pg-mcp-guard",
                    "args": ["serve", "--config", path.display().to_string()],
                }
            }
        }))?
    );
    Ok(())
}

async fn doctor(path: &Path) -> Result<()> {
    println!("checking {}", path.display());
    let mut failures = 0;

    let config = match GuardConfig::load(path) {
        Ok(config) => {
            println!("  config: OK");
            config
        }
        Err(e) => {
            println!("  config: FAIL ({e})");
            bail!("doctor found problems");
        }
    };

    match db::connect(&config).await {
        Ok(pool) => {
            println!("  connect: OK");
            match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await {
                Ok(_) => println!("  query: OK"),
                Err(e) => {
                    println!("  query: FAIL ({e})");
                    failures += 1;
                }
            }
            match db::server_version(&pool).await {
                Ok(version) => println!("  server: {version}"),
                Err(e) => {
                    println!("  server: FAIL ({e})");
                    failures += 1;
                }
            }
        }
        Err(e) => {
            println!("  connect: FAIL ({e})");
            failures += 1;
        }
    }

    let default_timeout = Duration::from_secs(config.default_hook_timeout_seconds);
    for (kind, entries) in [
        ("before_query", &config.server_hooks.before_query),
        ("after_query", &config.server_hooks.after_query),
    ] {
        let chain = HookChain::from_config(kind, entries, default_timeout)?;
        for (label, result) in chain.probe() {
            match result {
                Ok(()) => println!("  {label}: OK"),
                Err(e) => {
                    println!("  {label}: FAIL ({e})");
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        bail!("doctor found {failures} problem(s)");
    }
    println!("all checks passed");
    Ok(())
}
