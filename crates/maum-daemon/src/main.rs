//! maumd — Korean emotion-analysis batch daemon.
//!
//! Runs the session pipeline on a fixed interval, or one-shot via
//! subcommands. All state lives under the data directory; the LLM API key
//! comes from the environment and its absence is a startup error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use maum_core::MaumConfig;
use maum_infer::EmbedderBackend;
use maum_llm::OpenAiClient;
use maum_runtime::Orchestrator;
use maum_store::{EmotionStore, SeedEntry};

/// Default KB seed, written to the data directory on first start.
const DEFAULT_SEED: &str = include_str!("../seed/emotion_seed.json");

fn resolve_data_dir() -> PathBuf {
    std::env::var("MAUM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

struct Pipeline {
    config: MaumConfig,
    store: Arc<EmotionStore>,
    orchestrator: Orchestrator<OpenAiClient>,
}

fn init_pipeline() -> anyhow::Result<Pipeline> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = MaumConfig::from_env(&data_dir)?;

    // A broken embedder is fatal: silently degraded vectors would poison
    // the KB and cache.
    let embedder = maum_infer::load_embedder(&config.data_paths.models_dir)
        .map_err(|e| anyhow::anyhow!("Failed to load embedder: {}", e))?;
    info!(
        "Embedding model: {} (dim={})",
        config.embedding_model,
        embedder.dimension()
    );

    let store = Arc::new(
        EmotionStore::open(&config.data_paths.db_dir, embedder.dimension())
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?,
    );

    if store.kb_needs_rebuild()? {
        rebuild_kb(&store, &embedder, &config, None)?;
    }

    let llm = OpenAiClient::new(
        config.llm_base_url.as_str(),
        config.llm_model.as_str(),
        config.llm_api_key.as_str(),
        Duration::from_secs(config.llm_timeout_seconds),
    )?;

    let orchestrator = Orchestrator::new(
        store.clone(),
        embedder,
        llm,
        config.cache_similarity_threshold,
        config.cache_freshness_days,
    );

    Ok(Pipeline {
        config,
        store,
        orchestrator,
    })
}

fn load_seed(config: &MaumConfig, override_path: Option<&PathBuf>) -> anyhow::Result<Vec<SeedEntry>> {
    let seed_path = override_path.unwrap_or(&config.data_paths.seed_file);
    if override_path.is_none() && !seed_path.exists() {
        info!("No seed file at {}, writing bundled default", seed_path.display());
        std::fs::write(seed_path, DEFAULT_SEED)?;
    }
    let raw = std::fs::read_to_string(seed_path)?;
    let entries: Vec<SeedEntry> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Seed file {} is invalid: {}", seed_path.display(), e))?;
    Ok(entries)
}

fn rebuild_kb(
    store: &EmotionStore,
    embedder: &Arc<dyn EmbedderBackend>,
    config: &MaumConfig,
    seed_override: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let entries = load_seed(config, seed_override)?;
    info!("Rebuilding KB from {} seed entries", entries.len());

    let mut embedded = Vec::with_capacity(entries.len());
    for entry in entries {
        let embedding = embedder
            .embed(&entry.text)
            .map(|r| r.embedding)
            .ok_or_else(|| anyhow::anyhow!("Failed to embed seed text: {}", entry.text))?;
        embedded.push((entry, embedding));
    }

    let count = store.kb_rebuild(&embedded)?;
    info!("KB ready with {} entries", count);
    Ok(())
}

async fn run_loop(pipeline: &Pipeline) -> anyhow::Result<()> {
    let interval_secs = pipeline.config.batch_interval_seconds;
    info!(
        "Batch loop started: every {}s, up to {} sessions per pass",
        interval_secs, pipeline.config.batch_session_limit
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;

        match pipeline
            .orchestrator
            .batch_run(pipeline.config.batch_session_limit)
            .await
        {
            Ok(report) => {
                if report.scanned == 0 {
                    info!("No pending sessions");
                }
            }
            Err(e) => warn!("Batch pass failed: {}", e),
        }

        if let Err(e) = pipeline.store.cache_evict_stale(pipeline.config.cache_freshness_days) {
            warn!("Cache eviction failed: {}", e);
        }
    }
}

fn print_help() {
    println!("maumd — Korean emotion-analysis batch daemon");
    println!();
    println!("Usage: maumd [command]");
    println!();
    println!("Commands:");
    println!("  (none)                 Run the batch loop");
    println!("  batch [limit]          Run one batch pass and exit");
    println!("  analyze <text>         Analyze a single text and print the result JSON");
    println!("  init-kb [seed-path]    Force a KB rebuild from the seed file");
    println!("  help                   Show this help message");
    println!();
    println!("Environment:");
    println!("  MAUM_DATA_DIR                Data directory (default: data)");
    println!("  LLM_API_KEY                  Required API credential");
    println!("  LLM_MODEL, LLM_BASE_URL      Completion endpoint (default: gpt-4o-mini, OpenAI)");
    println!("  MAUM_BATCH_INTERVAL_SECONDS  Loop interval (default: 600)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None => {
            let pipeline = init_pipeline()?;
            run_loop(&pipeline).await
        }
        Some("batch") => {
            let pipeline = init_pipeline()?;
            let limit = match args.get(2) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("limit must be an integer: {}", raw))?,
                None => pipeline.config.batch_session_limit,
            };
            let report = pipeline.orchestrator.batch_run(limit).await?;
            println!(
                "scanned={} analyzed={} cache_hits={} skipped={} failed={}",
                report.scanned, report.analyzed, report.cache_hits, report.skipped, report.failed
            );
            Ok(())
        }
        Some("analyze") => {
            if args.len() < 3 {
                eprintln!("Usage: maumd analyze <text>");
                std::process::exit(1);
            }
            let text = args[2..].join(" ");
            let pipeline = init_pipeline()?;
            let result = pipeline.orchestrator.analyze_text(&text).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Some("init-kb") => {
            let data_dir = resolve_data_dir();
            let config = MaumConfig::from_env(&data_dir)?;
            let embedder = maum_infer::load_embedder(&config.data_paths.models_dir)
                .map_err(|e| anyhow::anyhow!("Failed to load embedder: {}", e))?;
            let store = EmotionStore::open(&config.data_paths.db_dir, embedder.dimension())
                .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
            let seed_override = args.get(2).map(PathBuf::from);
            rebuild_kb(&store, &embedder, &config, seed_override.as_ref())?;
            Ok(())
        }
        Some("help") | Some("--help") | Some("-h") => {
            print_help();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'maumd help' for usage.", other);
            std::process::exit(1);
        }
    }
}
