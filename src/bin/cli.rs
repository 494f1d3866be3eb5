// CLI binary: exiting on unrecoverable errors is fine here.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use actionmap::context::{ActionContext, DeclaredAction};
use actionmap::describe;
use actionmap::index::{self, IndexSnapshot};
use actionmap::llm::HttpTransport;
use actionmap::resolver::{CommandResolver, Resolution};
use actionmap::settings::{self, AppSettings, CompletionConfigInfo};
use actionmap::tree::snapshot::{self, InvocationLog};
use actionmap::tree::NodeRef;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "actionmap-cli", about = "Index UI tree snapshots and resolve commands", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized component tree of a snapshot file
    Tree { file: PathBuf },
    /// Print the semantic structure of a snapshot file
    Semantic { file: PathBuf },
    /// List the actions discovered in a snapshot file
    Actions { file: PathBuf },
    /// Resolve a command by keyword overlap with the discovered actions
    Match {
        file: PathBuf,
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Resolve a command through the completion endpoint
    Ask {
        file: PathBuf,
        /// Model override for this request
        #[arg(long)]
        model: Option<String>,
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Serve the latest index of a snapshot file over HTTP
    #[cfg(feature = "inspect-server")]
    Serve {
        file: PathBuf,
        #[arg(long, default_value_t = 7878)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings (API key redacted)
    Show,
    /// Store the API key; an empty key removes it
    SetKey { key: String },
    SetModel { model: String },
    SetBaseUrl { url: String },
    /// Turn the invocation audit log on or off
    SetAudit {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

// ── Helpers ──────────────────────────────────────────────────────

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap());
}

fn load_tree(file: &Path, log: &InvocationLog) -> NodeRef {
    let node = snapshot::load_file(file).unwrap_or_else(|e| fail(e));
    snapshot::build(&node, log)
}

fn load_index(file: &Path, log: &InvocationLog) -> IndexSnapshot {
    index::index_tree(Some(&load_tree(file, log)))
}

fn print_resolution(
    resolver: &CommandResolver,
    resolution: &Resolution,
    log: &InvocationLog,
    raw: bool,
) {
    if raw {
        print_json(&serde_json::json!({
            "resolution": resolution,
            "status": resolver.status(),
            "invocations": log.calls(),
        }));
        return;
    }
    println!("{}", resolver.status());
    for call in log.calls() {
        let args: Vec<String> = call.args.iter().map(ToString::to_string).collect();
        println!("  called {}({})", call.handler, args.join(", "));
    }
}

fn update_settings(config_dir: &Path, change: impl FnOnce(&mut AppSettings)) {
    let mut current = settings::load_or_default(config_dir);
    change(&mut current);
    settings::save_settings(config_dir, &current).unwrap_or_else(|e| fail(e));
    println!("Saved {}", actionmap::paths::settings_path(config_dir).display());
}

fn run_config(config_dir: &Path, action: ConfigAction) {
    match action {
        ConfigAction::Show => {
            let current = settings::load_or_default(config_dir);
            print_json(&serde_json::json!({
                "config_dir": config_dir,
                "completion": CompletionConfigInfo::from_config(&current.completion),
                "audit_invocations": current.audit_invocations,
            }));
        }
        ConfigAction::SetKey { key } => {
            settings::save_api_key(config_dir, key.trim()).unwrap_or_else(|e| fail(e));
            if key.trim().is_empty() {
                println!("API key removed");
            } else {
                println!("API key saved");
            }
        }
        ConfigAction::SetModel { model } => {
            update_settings(config_dir, |s| s.completion.model = Some(model));
        }
        ConfigAction::SetBaseUrl { url } => {
            update_settings(config_dir, |s| s.completion.base_url = Some(url));
        }
        ConfigAction::SetAudit { enabled } => {
            update_settings(config_dir, |s| s.audit_invocations = enabled);
        }
    }
}

#[cfg(feature = "inspect-server")]
async fn run_serve(file: &Path, port: u16) {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use actionmap::scheduler::{mutation_channel, ReindexConfig, Reindexer, SharedRoot};

    let log = InvocationLog::new();
    let root = load_tree(file, &log);
    let reindexer =
        Reindexer::new(Arc::new(SharedRoot::new(Some(root))), ReindexConfig::default());
    let (_mutations, receiver) = mutation_channel();
    reindexer.mount(receiver);

    let addr = actionmap::api::start_inspect_server(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .await
        .unwrap_or_else(|e| fail(e));
    eprintln!("Serving {} on http://{addr}", file.display());
    eprintln!("  GET /semantic  /registry  /action-map  /action-map/{{id}}");

    let _ = tokio::signal::ctrl_c().await;
    reindexer.teardown();
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("actionmap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(actionmap::paths::default_config_dir);
    let raw = cli.json;

    match cli.command {
        Commands::Tree { file } => {
            let log = InvocationLog::new();
            let root = load_tree(&file, &log);
            print_json(&index::walk(Some(&root)));
        }
        Commands::Semantic { file } => {
            let snapshot = load_index(&file, &InvocationLog::new());
            match (&snapshot.semantic_structure, raw) {
                (Some(root), false) => println!("{}", describe::describe_semantic(root)),
                (structure, _) => print_json(structure),
            }
        }
        Commands::Actions { file } => {
            let snapshot = load_index(&file, &InvocationLog::new());
            if raw {
                print_json(&snapshot.action_map);
            } else {
                println!("{}", describe::describe_actions(&snapshot.action_map));
            }
        }
        Commands::Match { file, query } => {
            let log = InvocationLog::new();
            let snapshot = load_index(&file, &log);
            let context = ActionContext::new();
            for action in snapshot.registry.iter() {
                context.register(DeclaredAction::new(
                    action.id.clone(),
                    action.description.clone(),
                    action.handler.clone(),
                ));
            }

            let mut resolver = CommandResolver::new();
            if settings::load_or_default(&config_dir).audit_invocations {
                resolver = resolver.with_audit_dir(config_dir.clone());
            }
            resolver.set_query(query.join(" "));
            let resolution = resolver.resolve_local(&context);
            print_resolution(&resolver, &resolution, &log, raw);
        }
        Commands::Ask { file, model, query } => {
            let log = InvocationLog::new();
            let snapshot = load_index(&file, &log);
            let mut current = settings::load_or_default(&config_dir);
            if model.is_some() {
                current.completion.model = model;
            }
            let transport =
                HttpTransport::from_config(&current.completion).unwrap_or_else(|e| fail(e));
            tracing::debug!(
                url = %transport.provider().url,
                model = %transport.provider().model,
                "using endpoint"
            );

            let mut resolver = CommandResolver::new();
            if current.audit_invocations {
                resolver = resolver.with_audit_dir(config_dir.clone());
            }
            resolver.set_query(query.join(" "));
            let resolution = resolver.resolve_remote(&transport, &snapshot).await;
            print_resolution(&resolver, &resolution, &log, raw);
            if matches!(resolution, Resolution::Failed { .. }) {
                process::exit(1);
            }
        }
        Commands::Config { action } => run_config(&config_dir, action),
        #[cfg(feature = "inspect-server")]
        Commands::Serve { file, port } => run_serve(&file, port).await,
    }
}
