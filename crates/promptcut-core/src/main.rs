//! promptcut CLI - ingest, edit, undo, and inspect media edit sessions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

use promptcut_core::{
    EngineConfig, LlmPlanner, Orchestrator, Planner, ScriptSynthesizer, SessionId, SessionStore,
    SingleStepPlanner,
};
use promptcut_exec::Executor;
use promptcut_gen::GeminiClient;
use promptcut_plugins::PluginRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Command::new("promptcut")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prompt-driven media editing with sandbox-certified scripts")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to an engine TOML config"),
        )
        .subcommand(
            Command::new("ingest")
                .about("Create a session from a media file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Media file to ingest as version 0"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Apply an editing instruction to a session")
                .arg(Arg::new("session").required(true).help("Session id"))
                .arg(Arg::new("prompt").required(true).help("Editing instruction"))
                .arg(
                    Arg::new("base-index")
                        .long("base-index")
                        .value_parser(value_parser!(usize))
                        .help("Edit from this history index instead of the current one"),
                )
                .arg(
                    Arg::new("multi-step")
                        .long("multi-step")
                        .action(ArgAction::SetTrue)
                        .help("Decompose the instruction into tool steps via the LLM planner"),
                ),
        )
        .subcommand(
            Command::new("undo")
                .about("Move a session's pointer back")
                .arg(Arg::new("session").required(true).help("Session id"))
                .arg(
                    Arg::new("steps")
                        .long("steps")
                        .default_value("1")
                        .value_parser(value_parser!(usize))
                        .help("How many versions to step back"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Print a session's version history")
                .arg(Arg::new("session").required(true).help("Session id")),
        );

    let matches = cli.get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };
    let store = SessionStore::new(&config.sessions_dir);

    match matches.subcommand() {
        Some(("ingest", args)) => {
            let file = args.get_one::<PathBuf>("file").expect("required");
            let id = store.ingest(file).await?;
            println!("{id}");
        }
        Some(("edit", args)) => {
            let id = parse_session(args.get_one::<String>("session").expect("required"))?;
            let prompt = args.get_one::<String>("prompt").expect("required");
            let base_index = args.get_one::<usize>("base-index").copied();

            let client = Arc::new(GeminiClient::new());
            let registry = Arc::new(PluginRegistry::standard());
            let synthesizer = ScriptSynthesizer::new(client.clone())
                .with_retry_budget(config.retry_budget)
                .with_retry_candidates(config.retry_candidates);
            let orchestrator = Orchestrator::new(
                registry.clone(),
                synthesizer,
                Executor::with_interpreter(&config.python),
            )
            .with_step_timeout(config.step_timeout());

            let planner: Box<dyn Planner> = if args.get_flag("multi-step") {
                Box::new(LlmPlanner::new(client))
            } else {
                Box::new(SingleStepPlanner::new(&config.default_tool))
            };

            let report = store
                .edit(id, prompt, base_index, planner.as_ref(), &registry, &orchestrator)
                .await?;
            if report.no_op {
                println!("nothing to do; session stays at version {}", report.index);
            } else {
                println!("version {} -> {}", report.index, report.artifact);
            }
        }
        Some(("undo", args)) => {
            let id = parse_session(args.get_one::<String>("session").expect("required"))?;
            let steps = *args.get_one::<usize>("steps").expect("defaulted");
            let index = store.undo(id, steps).await?;
            println!("session now at version {index}");
        }
        Some(("history", args)) => {
            let id = parse_session(args.get_one::<String>("session").expect("required"))?;
            let history = store.history(id)?;
            for entry in &history.history {
                let marker = if entry.index == history.current_index {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {:>3}  {}  {}  {}",
                    entry.index,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.output,
                    entry.prompt,
                );
            }
        }
        _ => unreachable!("arg_required_else_help"),
    }

    Ok(())
}

fn parse_session(raw: &str) -> anyhow::Result<SessionId> {
    SessionId::parse(raw).with_context(|| format!("invalid session id {raw:?}"))
}
