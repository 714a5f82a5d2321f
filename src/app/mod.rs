//! Application setup and runtime.

pub mod config;

use crate::{
  db, http,
  ingest::{Ingestor, Scheduler},
  storage::{self, ObjectStore},
};
use config::Config;
use sqlx::SqlitePool;
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub db: SqlitePool,
  pub store: Arc<dyn ObjectStore>,
  pub config: Arc<Config>,
  pub ingestor: Arc<Ingestor>,
}

impl AppState {
  /// Wire the pipeline to an already migrated pool and a storage backend.
  pub fn new(db: SqlitePool, store: Arc<dyn ObjectStore>, config: Config) -> Self {
    let ingestor = Arc::new(Ingestor::new(db.clone(), store.clone(), config.ingest.clone()));
    AppState {
      db,
      store,
      config: Arc::new(config),
      ingestor,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// HTTP API plus the periodic sync.
  Server,
  /// Periodic sync only.
  Sync,
}

/// Build shared state from the environment.
pub async fn bootstrap(config: Config) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
  let pool = db::connect(&config.database).await?;
  let store = storage::from_config(&config.storage).await;
  Ok(AppState::new(pool, store, config))
}

/// Start the scheduler and, in server mode, the HTTP API. Returns on Ctrl-C.
pub async fn run(mode: Mode) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let config = Config::from_env();
  let state = bootstrap(config).await?;
  let ingest = &state.config.ingest;
  info!(
    "sync every {:?} in {:?} mode, prefix {:?}, inbox cap {}",
    ingest.interval, ingest.mode, ingest.prefix, ingest.retention_cap
  );
  let scheduler = Scheduler::start(state.ingestor.clone(), ingest.interval);

  match mode {
    Mode::Server => {
      let addr: SocketAddr = state.config.server.bind_addr.parse()?;
      let app = http::build_router(state.clone());
      info!("webmail API:      http://{}/emails", addr);
      info!("sync trigger:     POST http://{}/sync", addr);
      info!("run log:          http://{}/logs", addr);

      let listener = tokio::net::TcpListener::bind(addr).await?;
      axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    }
    Mode::Sync => shutdown_signal().await,
  }

  info!("shutting down, waiting for the current sync pass");
  scheduler.stop().await;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("could not listen for ctrl-c: {e}");
    std::future::pending::<()>().await;
  }
}
