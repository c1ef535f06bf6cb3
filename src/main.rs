mod commands;

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use claimcheck::cache::MemoryCache;
use claimcheck::evidence::providers::{GoogleCustomSearch, GoogleFactCheck, NewsDataSearch, SerpApiSearch};
use claimcheck::llm::LlmClient;
use claimcheck::store::ReportStore;
use claimcheck::traits::{FactClaimProvider, ReportPersistence, SearchProvider, TextGenerator};
use claimcheck::{AppState, Collaborators, Orchestrator, PipelineConfig};

use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "claimcheck", version, about = "Evidence-backed fact checking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state = build_state(PipelineConfig::from_env()).await?;

    let outcome = match cli.command {
        Command::Check {
            text,
            context_date,
            json,
        } => commands::check::check(&state, text, context_date, json).await,
        Command::History { limit } => commands::history::history(&state, limit).await,
        Command::Show { id, json } => commands::history::show(&state, &id, json).await,
    };

    state.orchestrator.flush_persistence().await;
    outcome
}

async fn build_state(config: PipelineConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(ReportStore::new(&config.data_dir).await?);
    info!(data_dir = ?config.data_dir, "report store initialized");

    let generator = LlmClient::from_env()?.map(|c| Arc::new(c) as Arc<dyn TextGenerator>);
    if generator.is_none() {
        info!("LLM_BASE_URL not set, using heuristic analysis and evaluation");
    }

    let mut search: Vec<Arc<dyn SearchProvider>> = Vec::new();
    if let Some(p) = GoogleCustomSearch::from_env()? {
        search.push(Arc::new(p));
    }
    if let Some(p) = SerpApiSearch::from_env()? {
        search.push(Arc::new(p));
    }
    if let Some(p) = NewsDataSearch::from_env()? {
        search.push(Arc::new(p));
    }

    let mut fact_claims: Vec<Arc<dyn FactClaimProvider>> = Vec::new();
    if let Some(p) = GoogleFactCheck::from_env()? {
        fact_claims.push(Arc::new(p));
    }

    info!(
        search = search.len(),
        fact_claims = fact_claims.len(),
        llm = generator.is_some(),
        "collaborators configured"
    );

    let collaborators = Collaborators {
        generator,
        search,
        fact_claims,
        cache: Arc::new(MemoryCache::new(config.ttl)),
        persistence: Some(store.clone() as Arc<dyn ReportPersistence>),
    };
    let orchestrator = Arc::new(Orchestrator::new(&config, collaborators));

    Ok(AppState {
        config,
        orchestrator,
        store,
    })
}
