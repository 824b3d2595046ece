use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_cell::StaticCredentialProvider;
use glaucoma_clinic_api::{create_router, Services};
use screening_cell::load_classifier;
use shared_config::{AppConfig, StoreBackend};
use shared_database::{DocumentStore, InMemoryDocumentStore, SupabaseDocumentStore};
use shared_utils::session::SessionStore;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Glaucoma Clinic API server");

    let config = AppConfig::from_env();

    // Both are fatal: the service is useless without a model or accounts.
    let classifier = load_classifier(&config).context("Failed to load the glaucoma model")?;
    let credentials = StaticCredentialProvider::from_source(&config.credentials)
        .context("Failed to load clinic accounts")?;

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Supabase => {
            if !config.is_supabase_configured() {
                bail!("STORE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_SERVICE_KEY");
            }
            info!("Using Supabase document store at {}", config.supabase_url);
            Arc::new(SupabaseDocumentStore::new(&config))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory document store; patient records will not survive a restart");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let sessions = SessionStore::new(chrono::Duration::minutes(config.session_ttl_minutes));
    let purge = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            purge.purge_expired().await;
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bind_addr = config.bind_addr.clone();
    let app = create_router(Services {
        config,
        classifier,
        credentials: Arc::new(credentials),
        store,
        sessions,
    })?
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(cors);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
