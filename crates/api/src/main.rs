use std::net::SocketAddr;
use std::sync::Arc;

use reelsearch_core::scene_store::{InMemorySceneStore, SceneStore};
use reelsearch_embed::{EmbeddingConfig, EmbeddingGenerator, ExtractorCache, HttpExtractorLoader};
use reelsearch_search::{EngineConfig, RetrievalEngine, SidecarMediaSource};
use reelsearch_vectors::chroma::ChromaApi;
use reelsearch_vectors::Collections;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelsearch_api::config::ServerConfig;
use reelsearch_api::router::build_app_router;
use reelsearch_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reelsearch_api=debug,reelsearch_search=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let engine_config = EngineConfig::from_env();
    engine_config
        .validate()
        .expect("Invalid engine configuration");
    let embedding_config = EmbeddingConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Scene store ---
    let (pool, scenes) = match &config.database_url {
        Some(url) => {
            let pool = reelsearch_db::create_pool(url)
                .await
                .expect("Failed to connect to database");
            reelsearch_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");
            (
                Some(pool.clone()),
                Arc::new(reelsearch_db::PgSceneStore::new(pool)) as Arc<dyn SceneStore>,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping scenes in memory");
            (None, Arc::new(InMemorySceneStore::new()) as Arc<dyn SceneStore>)
        }
    };

    // --- Vector store ---
    let (chroma, collections) = match &config.chroma_url {
        Some(url) => {
            let api = Arc::new(ChromaApi::new(url.clone()));
            let collections = Collections::connect_chroma(Arc::clone(&api))
                .await
                .expect("Failed to initialize vector collections");
            tracing::info!(url = %url, "Vector collections ready");
            (Some(api), collections)
        }
        None => {
            tracing::warn!("CHROMA_URL not set, keeping vectors in memory");
            (None, Collections::in_memory())
        }
    };

    // --- Models ---
    let loader = Arc::new(HttpExtractorLoader::new(embedding_config.inference_url.clone()));
    let cache = Arc::new(ExtractorCache::new(loader, embedding_config.models.clone()));
    let generator = Arc::new(EmbeddingGenerator::new(Arc::clone(&cache), &embedding_config));
    tokio::spawn(async move {
        for (role, error) in cache.warm_up().await {
            tracing::error!(%role, %error, "Model failed to load");
        }
    });

    // --- Engine ---
    let media = Arc::new(SidecarMediaSource::new(engine_config.media_root.clone()));
    let engine = RetrievalEngine::new(generator, collections, scenes, media, engine_config);

    let state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
        pool,
        chroma,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
