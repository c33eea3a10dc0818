//! Thin CLI host: compiles a process definition, injects a token, and
//! drains the firing queue to completion. Grounded in the teacher's
//! `bpmn-lite-server/src/main.rs` for the `tracing_subscriber` setup and
//! the CLI-arg-then-env-var config fallback pattern — scaled down from a
//! gRPC server to a one-shot command since network service surfaces are
//! out of scope here.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colorflow_core::{
    catalogue::SpecCatalogue, chain::ChainValidator, dto, engine::FiringEngine,
    resolver::Resolver, store::TokenRepository, store_memory::MemoryTokenStore, types::Token,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Parser, Debug)]
#[command(name = "colorflow", about = "Token-driven workflow engine host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a process definition and report whether it compiles.
    Compile {
        /// Path to a process YAML document.
        #[arg(long)]
        process: PathBuf,
        /// Path to a resource-spec catalogue YAML document.
        #[arg(long)]
        catalogue: Option<PathBuf>,
    },
    /// Compile a process, inject one token, and drain the firing queue.
    Run {
        #[arg(long)]
        process: PathBuf,
        #[arg(long)]
        catalogue: Option<PathBuf>,
        /// Task id the injected token starts at.
        #[arg(long)]
        start_task: String,
        /// Path to a JSON file containing the token's `content` map.
        #[arg(long)]
        token: PathBuf,
        /// Token time-to-live, in seconds. Falls back to
        /// `COLORFLOW_TTL_SECS`, then to a one-hour default.
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile { process, catalogue } => compile(process, catalogue),
        Command::Run {
            process,
            catalogue,
            start_task,
            token,
            ttl_secs,
        } => run(process, catalogue, start_task, token, ttl_secs).await,
    }
}

fn load_catalogue(path: Option<PathBuf>) -> Result<SpecCatalogue> {
    match path {
        Some(path) => {
            let yaml = std::fs::read_to_string(&path)
                .with_context(|| format!("read catalogue {}", path.display()))?;
            Ok(SpecCatalogue::from_yaml_str(&yaml))
        }
        None => Ok(SpecCatalogue::new()),
    }
}

fn compile(process_path: PathBuf, catalogue_path: Option<PathBuf>) -> Result<()> {
    let yaml = std::fs::read_to_string(&process_path)
        .with_context(|| format!("read process {}", process_path.display()))?;
    let mut process = dto::process_from_yaml_str(&yaml).context("parse process definition")?;

    let catalogue = load_catalogue(catalogue_path)?;
    let validator = ChainValidator::new(&catalogue);
    process.compile(&validator);
    match process.compile_result() {
        Ok(()) => {
            println!("compile ok: process '{}'", process.process_id);
            Ok(())
        }
        Err(err) => bail!("compile failed for process '{}': {err}", process.process_id),
    }
}

/// Resolves `module_path:symbol` targets to built-in demo handlers. Hosts
/// embedding `colorflow-core` as a library register their own handlers via
/// [`colorflow_core::resolver::Resolver::register`] instead of relying on
/// this — the CLI only ever knows the handful of no-op targets below.
fn builtin_resolver() -> Resolver {
    let mut resolver = Resolver::new();
    resolver.register(
        "builtin:identity",
        |input: &HashMap<String, serde_json::Value>, _config: &HashMap<String, serde_json::Value>| {
            Ok(input.clone())
        },
    );
    resolver
}

fn resolve_ttl_secs(cli_value: Option<u64>) -> u64 {
    if let Some(value) = cli_value {
        return value;
    }
    std::env::var("COLORFLOW_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TTL_SECS)
}

async fn run(
    process_path: PathBuf,
    catalogue_path: Option<PathBuf>,
    start_task: String,
    token_path: PathBuf,
    ttl_secs: Option<u64>,
) -> Result<()> {
    let process_yaml = std::fs::read_to_string(&process_path)
        .with_context(|| format!("read process {}", process_path.display()))?;
    let mut process = dto::process_from_yaml_str(&process_yaml).context("parse process definition")?;

    let catalogue = load_catalogue(catalogue_path)?;
    let validator = ChainValidator::new(&catalogue);
    process.compile(&validator);
    if let Err(err) = process.compile_result() {
        bail!(
            "refusing to run an uncompiled process '{}': {err}; fix the definition and re-run `compile`",
            process.process_id
        );
    }

    let content_json = std::fs::read_to_string(&token_path)
        .with_context(|| format!("read token {}", token_path.display()))?;
    let content: HashMap<String, serde_json::Value> =
        serde_json::from_str(&content_json).context("parse token content as JSON")?;
    let token = Token::new(uuid::Uuid::new_v4().to_string(), process.process_id.clone(), content, HashMap::new());
    process.inject_token(&start_task, token);

    let resolver = builtin_resolver();
    let ttl = Duration::from_secs(resolve_ttl_secs(ttl_secs));
    let engine = FiringEngine::new(&catalogue, &resolver, ttl);

    let store = MemoryTokenStore::new();
    let mut steps = 0u32;
    while let Some(result) = engine.run_step(&mut process) {
        steps += 1;
        println!(
            "[{}] task={} success={} routes={} elapsed_ms={:.3} message={}",
            steps, result.task_id, result.success, result.routes_triggered, result.elapsed_ms, result.message
        );
        if let Some(token) = result.new_token {
            store.save(token).await.context("persist token")?;
        }
    }

    println!(
        "done: {} step(s), {} token(s) completed",
        steps,
        process.completed().len()
    );
    Ok(())
}
