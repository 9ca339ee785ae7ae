use anyhow::{Context, Result};
use clap::Parser;
use forecast_server::services::ingest::IngestionEngine;
use forecast_server::services::provider::{FixtureProvider, ForecastProvider, TomorrowClient};
use forecast_server::services::query::QueryEngine;
use forecast_server::services::retention::RetentionSweeper;
use forecast_server::services::scheduler::{ForecastPipeline, ForecastScheduler};
use forecast_server::store::{ForecastStore, PgForecastStore};
use forecast_server::{cli, config, db, openapi, routes, state};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind forecast-server listener on {addr}: port already in use. Stop the other service using this port or re-run with --port to choose another port.",
            );
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to bind forecast-server listener on {addr}"))
        }
    }
}

fn build_provider(config: &config::ServerConfig) -> Result<Arc<dyn ForecastProvider>> {
    if let Some(path) = config.provider_fixture_path.as_deref() {
        tracing::info!(path = %path.display(), "serving forecasts from fixture file");
        return Ok(Arc::new(FixtureProvider::from_path(path)?));
    }
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build provider HTTP client")?;
    Ok(Arc::new(TomorrowClient::new(
        http,
        config.provider_base_url.clone(),
        config.provider_api_key.clone(),
        config.provider_timeout(),
    )))
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err:#}");
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    if args.print_openapi {
        println!(
            "{}",
            serde_json::to_string_pretty(&openapi::openapi_json())?
        );
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::ServerConfig::from_env()?;
    let pool = db::connect_lazy(&config.database_url, config.db_max_connections)?;
    db::ensure_schema(&pool)
        .await
        .context("failed to prepare forecast schema")?;
    if !config.seed_locations.is_empty() {
        let seeded = db::seed_geolocations(&pool, &config.seed_locations).await?;
        tracing::info!(seeded, "seeded tracked geolocations");
    }

    let store: Arc<dyn ForecastStore> = Arc::new(PgForecastStore::new(pool));
    let provider = build_provider(&config)?;
    let pipeline = Arc::new(ForecastPipeline::new(
        IngestionEngine::new(store.clone(), provider),
        RetentionSweeper::new(store.clone()),
    ));
    let state = state::AppState {
        query: Arc::new(QueryEngine::new(store)),
        pipeline: pipeline.clone(),
    };

    let cancel = CancellationToken::new();
    if config.enable_ingestion {
        ForecastScheduler::new(pipeline, config.ingest_interval()).start(cancel.clone());
    } else {
        tracing::info!("scheduled forecast ingestion disabled");
    }

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(10)
            .methods(vec![axum::http::Method::POST])
            .use_headers()
            .finish()
            .context("failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
        governor_limiter.retain_recent();
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = routes::router(state)
        .layer(GovernorLayer::new(governor_conf))
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", args.host, args.port);
    let listener = bind_listener(&addr).await?;
    tracing::info!(%addr, "forecast-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .await?;
    cancel.cancel();
    Ok(())
}
