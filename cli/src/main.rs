//! CLI entrypoint for roundtable
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context as _, Result, anyhow, bail};
use clap::Parser;
use roundtable_application::{
    CompositeEventSink, CompletionClient, EventSink, Orchestrator, PersonaRosterFactory,
    RunRoundtableInput, SessionRegistry, SessionStore,
};
use roundtable_domain::{ConvergenceReport, Document};
use roundtable_infrastructure::{
    ConfigLoader, FileConfig, FileSessionStore, JsonlEventLog, OpenAiCompatClient,
};
use roundtable_presentation::{
    Cli, Command, ConsoleFormatter, ContinueArgs, LoopArgs, OutputFormat, ProgressReporter,
    RunArgs,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting roundtable");

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!(e))?
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }

    match &cli.command {
        Command::Run(args) => {
            apply_limits(&mut config, &args.limits);
            run(&cli, &config, args).await
        }
        Command::Continue(args) => {
            apply_limits(&mut config, &args.limits);
            continue_session(&cli, &config, args).await
        }
        Command::List { limit } => {
            let store = file_store(&config, SessionRegistry::new());
            let sessions = store.list_sessions(*limit).await?;
            print!("{}", ConsoleFormatter::format_sessions(&sessions));
            Ok(())
        }
        Command::Show {
            session_id,
            version,
            output,
        } => show(&config, session_id, *version, *output).await,
        Command::Delete { session_id } => {
            let store = file_store(&config, SessionRegistry::new());
            store.delete_session(session_id).await?;
            println!("Deleted {}", session_id);
            Ok(())
        }
        Command::Config => {
            for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
                println!("{}", line);
            }
            println!();
            println!("Data directory: {}", config.storage.resolve_data_dir().display());
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Initialize logging based on verbosity level, optionally teeing to a file
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file {} has no file name", path.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Ok(Some(guard))
}

/// CLI flags win over file values
fn apply_limits(config: &mut FileConfig, limits: &LoopArgs) {
    if let Some(max) = limits.max_iterations {
        config.roundtable.max_iterations = max;
    }
    if let Some(threshold) = limits.delta_threshold {
        config.roundtable.delta_threshold = threshold;
    }
    if limits.force_max_iterations {
        config.roundtable.force_max_iterations = true;
    }
}

fn file_store(config: &FileConfig, registry: SessionRegistry) -> Arc<FileSessionStore> {
    Arc::new(FileSessionStore::new(config.storage.resolve_data_dir()).with_registry(registry))
}

// === Dependency Injection ===
fn build_orchestrator(config: &FileConfig) -> Result<Orchestrator> {
    config.validate()?;

    let registry = SessionRegistry::new();
    let store = file_store(config, registry.clone());
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::from_config(&config.llm)?);
    info!(model = client.model(), base_url = %config.llm.base_url, "Completion client ready");

    let factory = Arc::new(PersonaRosterFactory::new(
        client,
        config.llm.to_agent_params(),
    ));
    Ok(Orchestrator::new(store, factory, registry)
        .with_options(config.roundtable.to_run_options()))
}

fn event_log(config: &FileConfig) -> Option<JsonlEventLog> {
    if !config.logging.event_log {
        return None;
    }
    JsonlEventLog::new(config.storage.resolve_data_dir().join("events.jsonl"))
}

async fn run(cli: &Cli, config: &FileConfig, args: &RunArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    if content.trim().is_empty() {
        bail!("{} is empty", args.file.display());
    }
    let title = args.title.clone().unwrap_or_else(|| title_from_path(&args.file));

    let context = args
        .context
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "source_file".to_string(),
        json!(args.file.display().to_string()),
    );

    let orchestrator = build_orchestrator(config)?;
    let input = RunRoundtableInput::new(title, content, config.to_snapshot().with_context(context))
        .with_document_type(&args.document_type)
        .with_metadata(metadata)
        .with_config(config.roundtable.to_roundtable_config());

    let progress = ProgressReporter::new();
    let log = event_log(config);
    let events = sinks(cli.quiet, &progress, log.as_ref());

    let outcome = orchestrator.run_with_events(input, &events).await?;
    print_outcome(&outcome.report, &outcome.final_document, args.output);
    Ok(())
}

async fn continue_session(cli: &Cli, config: &FileConfig, args: &ContinueArgs) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let progress = ProgressReporter::new();
    let log = event_log(config);
    let events = sinks(cli.quiet, &progress, log.as_ref());

    let outcome = orchestrator
        .continue_from_with_events(
            &args.session_id,
            config.roundtable.to_roundtable_config(),
            &events,
        )
        .await?;
    print_outcome(&outcome.report, &outcome.final_document, args.output);
    Ok(())
}

async fn show(
    config: &FileConfig,
    session_id: &str,
    version: Option<u32>,
    output: OutputFormat,
) -> Result<()> {
    let store = file_store(config, SessionRegistry::new());
    if !store.exists(session_id).await? {
        bail!("Session {} not found", session_id);
    }

    let report = store.load_report(session_id).await?;
    let version = match (version, &report) {
        (Some(v), _) => v,
        (None, Some(report)) => report.final_version,
        (None, None) => {
            let latest = store
                .latest_version(session_id)
                .await?
                .with_context(|| format!("Session {} has no documents", session_id))?;
            eprintln!(
                "Session {} has no convergence report (failed or still running); showing v{}",
                session_id, latest
            );
            latest
        }
    };

    let reviews = store.load_reviews(session_id, version).await?;
    let document = store
        .load_document(session_id, version)
        .await?
        .with_reviews(reviews);

    match report {
        Some(report) if report.final_version == version => {
            print_outcome(&report, &document, output)
        }
        _ => match output {
            OutputFormat::Json => println!("{}", ConsoleFormatter::format_version_json(&document)),
            _ => println!("{}", ConsoleFormatter::format_version(&document)),
        },
    }
    Ok(())
}

fn print_outcome(report: &ConvergenceReport, document: &Document, output: OutputFormat) {
    let text = match output {
        OutputFormat::Full => ConsoleFormatter::format(report, document),
        OutputFormat::Summary => ConsoleFormatter::format_summary(report),
        OutputFormat::Json => ConsoleFormatter::format_json(report, document),
    };
    println!("{}", text);
}

fn sinks<'a>(
    quiet: bool,
    progress: &'a ProgressReporter,
    log: Option<&'a JsonlEventLog>,
) -> CompositeEventSink<'a> {
    let mut delegates: Vec<&'a dyn EventSink> = Vec::new();
    if !quiet {
        delegates.push(progress);
    }
    if let Some(log) = log {
        delegates.push(log);
    }
    CompositeEventSink::new(delegates)
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}
