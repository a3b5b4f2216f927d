//! CLI entrypoint for llm-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use council_application::{CouncilEngine, RunCouncilUseCase, StreamCouncilUseCase};
use council_domain::{OutputFormat, Query};
use council_infrastructure::{
    ConfigLoader, FileConfig, InMemoryMetrics, JsonlConversationLogger, StaticKnowledgeBase,
    build_gate, build_registry,
};
use council_presentation::{
    Cli, ConsoleFormatter, ConsoleStreamObserver, ProgressReporter, StreamRenderer,
};
use futures::StreamExt;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("{}", e))?
    };

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.log_dir());
    let _log_guard = init_tracing(cli.verbose, log_dir.as_deref());

    info!("Starting llm-council");

    for issue in config.ensure_valid()? {
        warn!("{}", issue);
    }

    let question = cli
        .question
        .clone()
        .context("A question is required (see --help)")?;
    let mut query = Query::new(question, cli.domain.as_str())?;
    if let Some(id) = &cli.conversation_id {
        query = query.with_conversation_id(id.clone());
    }

    // === Request gate ===
    let decision = build_gate(&config.rate_limit).check(&query);
    if !decision.allowed {
        bail!(
            "Query rejected: {}",
            decision.reason.as_deref().unwrap_or("denied by request gate")
        );
    }
    if let Some(disclaimer) = &decision.disclaimer {
        eprintln!("{}", disclaimer);
    }

    // === Dependency Injection ===
    let metrics = InMemoryMetrics::start(config.metrics.retention(), config.metrics.purge_interval());
    let engine = build_engine(&config, &query, Arc::clone(&metrics))?;

    let format = cli
        .output
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();
    ConsoleFormatter::set_color(config.output.color);
    let params = config.council_params();

    let succeeded = if cli.stream {
        let use_case = StreamCouncilUseCase::new(engine).with_params(params);
        let observer = Arc::new(ConsoleStreamObserver::new(
            cli.quiet || format == OutputFormat::Json,
        ));

        let mut events = use_case.execute(query, observer);
        let mut renderer = StreamRenderer::new(format);
        while let Some(event) = events.next().await {
            renderer.render(&event, &mut std::io::stdout())?;
        }
        !renderer.failed()
    } else {
        let use_case = RunCouncilUseCase::new(engine).with_params(params);
        let result = if cli.quiet || format == OutputFormat::Json {
            use_case.execute(query).await?
        } else {
            let progress = ProgressReporter::new();
            use_case.execute_with_progress(query, &progress).await?
        };

        let output = match format {
            OutputFormat::Full => ConsoleFormatter::format(&result),
            OutputFormat::Synthesis => ConsoleFormatter::format_synthesis_only(&result),
            OutputFormat::Json => ConsoleFormatter::format_json(&result),
        };
        println!("{}", output);
        true
    };

    debug!(snapshot = ?metrics.snapshot(), "Council metrics");
    metrics.shutdown();

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_engine(
    config: &FileConfig,
    query: &Query,
    metrics: Arc<InMemoryMetrics>,
) -> Result<CouncilEngine> {
    let registry = build_registry(&config.providers)?;
    let catalog = config.to_catalog();
    info!(
        "{} providers, {} domain profiles",
        registry.len(),
        catalog.len()
    );

    let base_dir = std::env::current_dir().context("Cannot resolve working directory")?;
    let knowledge = StaticKnowledgeBase::from_entries(&config.knowledge, &base_dir);

    let mut engine = CouncilEngine::new(Arc::new(registry), Arc::new(catalog))
        .with_knowledge(Arc::new(knowledge))
        .with_metrics(metrics);

    if let Some(dir) = config.logging.conversation_log_dir()
        && let Some(logger) = JsonlConversationLogger::in_dir(&dir, query.conversation_id())
    {
        info!("Council transcript: {}", logger.path().display());
        engine = engine.with_conversation_logger(Arc::new(logger));
    }

    Ok(engine)
}

/// Install the stderr subscriber, plus a daily-rolling file when `log_dir` is set.
///
/// `RUST_LOG` overrides the level chosen by `-v`.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "llm-council.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    guard
}
