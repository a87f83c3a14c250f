//! Proposal Studio API - AI Proposal Generator backend
//!
//! Manages proposals, their ordered sections and a per-user image library,
//! and delegates content enhancement, drafting and chart generation to an
//! external language model.
//!
//! Storage is PostgreSQL by default; `STORAGE_BACKEND=memory` runs the same
//! API against an in-process store for local development.

mod agent;
mod config;
mod error;
mod models;
mod ordering;
mod preview;
mod routes;
mod service;
mod state;
mod store;
#[cfg(test)]
mod testing;

use crate::agent::{ChartAgent, ContentAgent, DisabledAgent, GroqAgent};
use crate::config::{DatabaseConfig, Settings, StorageBackend};
use crate::routes::create_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, ProposalRepository};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Proposal Studio API...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let store: Arc<dyn ProposalRepository> = match settings.storage {
        StorageBackend::Postgres => {
            let pool = init_database_pool(&settings.database).await?;
            info!("✅ Database pool created successfully");
            store::schema::create_tables(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            warn!("⚠️  Using in-memory storage, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let (content, charts) = init_agents(&settings);
    let state = Arc::new(AppState::new(store, content, charts));

    let app = create_router(state, &settings.cors);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Proposals ───");
    info!("   POST   /api/v1/proposals                    - Create proposal");
    info!("   GET    /api/v1/proposals                    - List proposals");
    info!("   GET    /api/v1/proposals/{{id}}               - Get proposal with sections");
    info!("   PATCH  /api/v1/proposals/{{id}}               - Update proposal");
    info!("   DELETE /api/v1/proposals/{{id}}               - Delete proposal");
    info!("   GET    /api/v1/proposals/{{id}}/preview       - HTML preview");
    info!("   POST   /api/v1/proposals/{{id}}/sections      - Append section");
    info!("   PUT    /api/v1/proposals/{{id}}/sections/order - Reorder sections");
    info!("");
    info!("   ─── Sections ───");
    info!("   PATCH  /api/v1/sections/{{id}}                - Update section");
    info!("   DELETE /api/v1/sections/{{id}}                - Delete section");
    info!("   GET    /api/v1/sections/{{id}}/versions       - Content history");
    info!("   PUT    /api/v1/sections/{{id}}/images/{{imageId}} - Attach image");
    info!("");
    info!("   ─── AI ───");
    info!("   POST   /api/v1/proposals/{{id}}/ai/draft      - Draft all sections");
    info!("   POST   /api/v1/sections/{{id}}/ai/enhance     - Enhance section");
    info!("   POST   /api/v1/sections/{{id}}/ai/chart       - Generate chart");
    info!("   GET    /api/v1/sections/{{id}}/ai/suggestions - Writing suggestions");
    info!("   POST   /api/v1/proposals/{{id}}/ai/expand-bullets - Expand bullet points");
    info!("");
    info!("   ─── Images ───");
    info!("   GET    /api/v1/users/{{userId}}/images        - List image library");
    info!("   POST   /api/v1/users/{{userId}}/images        - Add image");
    info!("");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,proposal_studio_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Build the Groq agent, or the disabled stand-in when no key is configured
fn init_agents(settings: &Settings) -> (Arc<dyn ContentAgent>, Arc<dyn ChartAgent>) {
    if settings.agent.api_key.is_none() {
        warn!("⚠️  GROQ_API_KEY not set, AI endpoints will answer 503");
        return (Arc::new(DisabledAgent), Arc::new(DisabledAgent));
    }

    match GroqAgent::new(&settings.agent) {
        Ok(agent) => {
            info!(
                "🤖 AI agent ready (model: {}, diagrams: {})",
                settings.agent.model, settings.agent.diagram_model
            );
            let agent = Arc::new(agent);
            let content: Arc<dyn ContentAgent> = agent.clone();
            (content, agent)
        }
        Err(e) => {
            warn!("⚠️  Failed to initialize AI agent, AI endpoints disabled: {}", e);
            (Arc::new(DisabledAgent), Arc::new(DisabledAgent))
        }
    }
}

/// Create the connection pool, with TLS when the database requires it
async fn init_database_pool(config: &DatabaseConfig) -> anyhow::Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    let pool = if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;
    client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!(
        "✅ Database connection successful ({}:{}/{}, TLS: {})",
        config.host, config.port, config.database, config.require_tls
    );
    Ok(pool)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
