use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reco_engine::config::StoreBackend;
use reco_engine::models::{Candidate, RecoContext};
use reco_engine::services::telemetry::{
    InMemorySessionStore, RedisSessionStore, SessionStore, SystemContextProvider, TelemetryEvent,
};
use reco_engine::{Config, RecommendationPipeline, TelemetryStore};
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One recommendation request: replayed events, the candidate pool and
/// the request context
#[derive(Debug, Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    events: Vec<TelemetryEvent>,
    candidates: Vec<Candidate>,
    context: RecoContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    config.validate()?;

    let store: Arc<dyn SessionStore> = match config.telemetry.store {
        StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
        StoreBackend::Redis => {
            let client = redis::Client::open(config.telemetry.redis_url.clone())
                .context("Failed to create Redis client")?;
            let ttl = config.telemetry.session_timeout_secs.max(1) as u64;
            Arc::new(RedisSessionStore::new(client).with_ttl(ttl))
        }
    };

    let request = read_request()?;

    let context_provider = Arc::new(SystemContextProvider::new());
    context_provider.set_weather(request.context.weather.clone());

    let telemetry = TelemetryStore::spawn(store, context_provider, config.telemetry.clone());
    let pipeline = RecommendationPipeline::from_config(telemetry, &config);

    info!(
        events = request.events.len(),
        candidates = request.candidates.len(),
        mode = request.context.mode.as_str(),
        "Handling recommendation request"
    );

    for event in request.events {
        pipeline.telemetry().capture(event);
    }

    let mut rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let recommendations = pipeline
        .recommend(request.candidates, &request.context, &mut rng)
        .await;

    println!("{}", serde_json::to_string_pretty(&recommendations)?);
    Ok(())
}

/// Read the request from the path given as the first argument, or stdin
fn read_request() -> anyhow::Result<RecommendRequest> {
    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("Invalid request JSON")
}
