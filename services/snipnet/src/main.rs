use std::sync::Arc;

use anyhow::{Result, bail};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    error::DatabaseError,
};
use sqlx::PgPool;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snipnet::{
    AppState,
    config::{ServerConfig, SessionConfig, StorageBackend},
    credentials::CredentialVerifier,
    oauth::{GitHubConfig, GitHubOAuth},
    repositories::{SnippetRepository, UserRepository},
    routes,
    sessions::RedisSessionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting snippet service");

    let server_config = ServerConfig::from_env()?;
    let session_config = SessionConfig::from_env()?;
    let verifier = CredentialVerifier::new();

    let (state, db_pool) = match StorageBackend::from_env()? {
        StorageBackend::Memory => {
            warn!("Using in-memory storage, nothing will survive a restart");
            (AppState::in_memory(verifier, session_config), None)
        }
        StorageBackend::Postgres => {
            let pool = connect_database().await?;

            let redis_config = RedisConfig::from_env()?;
            let redis_pool = RedisPool::new(&redis_config).await?;

            let state = AppState {
                users: Arc::new(UserRepository::new(pool.clone())),
                snippets: Arc::new(SnippetRepository::new(pool.clone())),
                sessions: Arc::new(RedisSessionStore::new(redis_pool)),
                verifier,
                oauth: None,
                session_config,
            };
            (state, Some(pool))
        }
    };

    let state = match GitHubConfig::from_env() {
        Some(config) => {
            info!("GitHub sign-in enabled");
            state.with_oauth(Arc::new(GitHubOAuth::new(config)?))
        }
        None => {
            info!("GitHub sign-in disabled, GH_CLIENT_ID or GH_CLIENT_SECRET not set");
            state
        }
    };

    // Start the web server
    let app = routes::create_router(state);

    let addr = server_config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Snippet service listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result??;
            bail!("Server stopped unexpectedly");
        }
        () = shutdown_signal() => {
            info!(grace = ?server_config.shutdown_grace, "Shutdown signal received, draining requests");
            stop_tx.send(()).ok();

            match tokio::time::timeout(server_config.shutdown_grace, &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!("Grace period elapsed, aborting remaining requests");
                    server.abort();
                }
            }
        }
    }

    if let Some(pool) = db_pool {
        pool.close().await;
    }

    info!("Snippet service stopped");
    Ok(())
}

/// Open the pool, check connectivity and bring the schema up to date
async fn connect_database() -> Result<PgPool> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        bail!("Failed to connect to database");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(DatabaseError::Migration)?;
    info!("Database migrations applied");

    Ok(pool)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
