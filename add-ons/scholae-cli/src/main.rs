//! Scholae CLI: builds the capability backends from configuration, runs one
//! operation, and prints its result (or a structured error report) as JSON.
//!
//! Usage:
//!   scholae <command> [args...]
//!   scholae --print-config
//!
//! Logs go to stderr; stdout carries only the JSON result.

use scholae_core::adapters::{InMemoryGraph, OpenRouterGenerator, SledMemoryStore};
use scholae_core::{
    Capabilities, ConsolidationEngine, FusionLayer, GraphReasoningEngine, MultiAgentOrchestrator, PaperRecord,
    ReasoningError, ResearchMemory, ScholaeConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage: scholae <command> [args...]

Memory:
  ingest <researcher> <paper_id> <title> [concept,concept,...]
  annotate <researcher> <paper_id> <text> [annotation_type]
  hypothesis <researcher> <text> [confidence]
  consolidate <researcher> [window_days]
  evolution <researcher> <concept>
  memory-gaps <researcher>
  report <researcher>

Graph reasoning:
  analogies <source> <target> [max]
  contradictions <concept>
  gaps <area>
  lifecycle <concept>
  influence <paper_id> [max_depth]
  synthesis <concept> <concept> [concept...]
  communities [min_size]

Fusion:
  view <researcher>
  serendipity <researcher>
  intuition <researcher> <context...>
  load <researcher>
  path <researcher> <target>
  explain <concept> <concept>
  query <researcher> <question...>

Agents:
  collaborate <researcher> <topic...>

Options:
  --print-config   Print the effective configuration as TOML
  --help           Print this message

Configuration: SCHOLAE_CONFIG (default config/scholae.toml) and SCHOLAE__* overrides.";

enum Failure {
    Usage(String),
    Reasoning(ReasoningError),
}

impl From<ReasoningError> for Failure {
    fn from(e: ReasoningError) -> Self {
        Failure::Reasoning(e)
    }
}

type CliResult<T> = Result<T, Failure>;

fn json<T: Serialize>(value: T) -> CliResult<Value> {
    serde_json::to_value(value).map_err(|e| Failure::Usage(format!("result not serializable: {e}")))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> CliResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Failure::Usage(format!("missing <{name}>")))
}

fn num_or<T: std::str::FromStr>(args: &[String], index: usize, name: &str, default: T) -> CliResult<T> {
    match args.get(index) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Failure::Usage(format!("<{name}> must be a number, got '{raw}'"))),
    }
}

fn rest(args: &[String], from: usize, name: &str) -> CliResult<String> {
    let joined = args.get(from..).unwrap_or_default().join(" ");
    if joined.trim().is_empty() {
        return Err(Failure::Usage(format!("missing <{name}>")));
    }
    Ok(joined)
}

/// Backends selected by configuration.
struct Engines {
    memory: ResearchMemory,
    consolidation: ConsolidationEngine,
    reasoning: GraphReasoningEngine,
    fusion: FusionLayer,
    agents: MultiAgentOrchestrator,
    store: Arc<SledMemoryStore>,
}

fn build(config: &ScholaeConfig) -> Result<Engines, String> {
    let graph = match config.graph.backend.as_str() {
        "in_memory" => match &config.graph.seed_path {
            Some(path) => InMemoryGraph::load_json(path).map_err(|e| format!("graph seed: {e}"))?,
            None => {
                tracing::warn!("no graph.seed_path configured; graph is empty");
                InMemoryGraph::new()
            }
        },
        other => return Err(format!("unsupported graph backend '{other}'")),
    };

    let store = Arc::new(
        SledMemoryStore::open_path(&config.storage_path)
            .map_err(|e| format!("cannot open memory store at {}: {e}", config.storage_path))?
            .with_cache_capacity(config.cache_capacity),
    );

    let mut caps = Capabilities::new(Arc::new(graph), store.clone()).with_timeout(config.capability_timeout());
    let text = &config.text_generation;
    match text.backend.as_str() {
        "none" => {}
        "openrouter" => match config.llm_api_key() {
            Some(key) => {
                let generator = OpenRouterGenerator::new(&key, text, config.capability_timeout())
                    .map_err(|e| format!("text generation: {e}"))?;
                tracing::info!(model = generator.model(), "text generation enabled");
                caps = caps.with_text(Arc::new(generator));
            }
            None => tracing::warn!("text_generation.backend is openrouter but no API key is set; generation disabled"),
        },
        other => return Err(format!("unsupported text generation backend '{other}'")),
    }

    Ok(Engines {
        memory: ResearchMemory::new(caps.clone()),
        consolidation: ConsolidationEngine::new(caps.clone()).with_config(config.consolidation.clone()),
        reasoning: GraphReasoningEngine::new(caps.clone()),
        fusion: FusionLayer::new(caps.clone()).with_config(config.fusion.clone(), config.consolidation.clone()),
        agents: MultiAgentOrchestrator::new(caps).with_text_settings(text),
        store,
    })
}

async fn run(engines: &Engines, command: &str, args: &[String]) -> CliResult<Value> {
    match command {
        "ingest" => {
            let concepts = args
                .get(3)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let paper = PaperRecord {
                paper_id: arg(args, 1, "paper_id")?.to_string(),
                title: Some(arg(args, 2, "title")?.to_string()),
                abstract_text: None,
                concepts,
            };
            let id = engines.memory.store_paper_memory(arg(args, 0, "researcher")?, &paper).await?;
            json(serde_json::json!({ "memory_id": id }))
        }
        "annotate" => {
            let kind = args.get(3).map(String::as_str).unwrap_or("note");
            let id = engines
                .memory
                .store_annotation(arg(args, 0, "researcher")?, arg(args, 1, "paper_id")?, arg(args, 2, "text")?, kind)
                .await?;
            json(serde_json::json!({ "memory_id": id }))
        }
        "hypothesis" => {
            let confidence = num_or(args, 2, "confidence", 0.5_f64)?;
            let id = engines
                .memory
                .store_hypothesis(arg(args, 0, "researcher")?, arg(args, 1, "text")?, &[], confidence)
                .await?;
            json(serde_json::json!({ "memory_id": id }))
        }
        "consolidate" => {
            let days = num_or(args, 1, "window_days", 7_u32)?;
            json(engines.consolidation.consolidate(arg(args, 0, "researcher")?, days).await?)
        }
        "evolution" => json(
            engines
                .consolidation
                .evolution(arg(args, 0, "researcher")?, arg(args, 1, "concept")?)
                .await?,
        ),
        "memory-gaps" => json(engines.consolidation.memory_gaps(arg(args, 0, "researcher")?).await?),
        "report" => json(engines.consolidation.report(arg(args, 0, "researcher")?).await?),
        "analogies" => {
            let max = num_or(args, 2, "max", 5_usize)?;
            json(
                engines
                    .reasoning
                    .analogies(arg(args, 0, "source")?, arg(args, 1, "target")?, max)
                    .await,
            )
        }
        "contradictions" => json(engines.reasoning.contradictions(arg(args, 0, "concept")?).await),
        "gaps" => json(engines.reasoning.research_gaps(arg(args, 0, "area")?).await),
        "lifecycle" => json(engines.reasoning.concept_lifecycle(arg(args, 0, "concept")?).await?),
        "influence" => {
            let depth = num_or(args, 1, "max_depth", 3_u32)?;
            json(
                engines
                    .reasoning
                    .influence_propagation(arg(args, 0, "paper_id")?, depth)
                    .await?,
            )
        }
        "synthesis" => json(engines.reasoning.synthesis_paths(args).await),
        "communities" => {
            let min = num_or(args, 0, "min_size", 3_usize)?;
            json(engines.reasoning.communities(min).await)
        }
        "view" => json(engines.fusion.personalized_view(arg(args, 0, "researcher")?).await?),
        "serendipity" => json(engines.fusion.serendipity(arg(args, 0, "researcher")?).await?),
        "intuition" => {
            let context = rest(args, 1, "context")?;
            json(engines.fusion.intuition(arg(args, 0, "researcher")?, &context).await?)
        }
        "load" => json(engines.fusion.cognitive_load(arg(args, 0, "researcher")?).await?),
        "path" => json(
            engines
                .fusion
                .learning_path(arg(args, 0, "researcher")?, arg(args, 1, "target")?)
                .await?,
        ),
        "explain" => json(
            engines
                .fusion
                .explain_connection(arg(args, 0, "concept")?, arg(args, 1, "concept")?)
                .await?,
        ),
        "query" => {
            let question = rest(args, 1, "question")?;
            json(engines.fusion.research_query(arg(args, 0, "researcher")?, &question).await?)
        }
        "collaborate" => {
            let topic = rest(args, 1, "topic")?;
            json(engines.agents.collaborate(arg(args, 0, "researcher")?, &topic).await?)
        }
        other => Err(Failure::Usage(format!("unknown command '{other}'"))),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("[scholae] cannot render result: {e}"),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[scholae] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    if matches!(command, "--help" | "-h" | "help") {
        println!("{USAGE}");
        return;
    }

    let config = match ScholaeConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[scholae] config: {e}");
            std::process::exit(1);
        }
    };

    if command == "--print-config" {
        match config.to_toml() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("[scholae] cannot render config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let engines = match build(&config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("[scholae] {e}");
            std::process::exit(1);
        }
    };

    let outcome = run(&engines, command, &args[1..]).await;
    if let Err(e) = engines.store.flush().await {
        tracing::warn!(error = %e, "memory store flush failed");
    }
    match outcome {
        Ok(value) => print_json(&value),
        Err(Failure::Usage(msg)) => {
            eprintln!("[scholae] {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
        Err(Failure::Reasoning(e)) => {
            match serde_json::to_value(e.report()) {
                Ok(report) => print_json(&report),
                Err(_) => eprintln!("[scholae] {e}"),
            }
            std::process::exit(1);
        }
    }
}
