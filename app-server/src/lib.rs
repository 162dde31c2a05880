//! # Warbook API Server
//!
//! HTTP surface over the rule-data store: collection CRUD for admins,
//! read access for signed-in users, and mention lookups.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        API Server                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Session (proxy headers) ──► routes ──► Registry (view / edit)  │
//! │                                │                                │
//! │              ┌─────────────────┼──────────────────┐             │
//! │              ▼                 ▼                  ▼             │
//! │       CollectionState   MentionScanner    ReferenceEditor       │
//! │              │                 │                  │             │
//! │              └────────────► EntityStore ◄─────────┘             │
//! │                                │                                │
//! │                     MemoryStore │ FileStore                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod registry;
pub mod routes;
pub mod selection;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use warbook_mentions::{MentionScanner, ReferenceCounter, ReferenceEditor};
use warbook_store::{DocumentStore, EntityStore, FileStore, MemoryStore};

pub use auth::{AdminAllowList, Session};
pub use config::{ConfigError, ServerConfig, StorageBackend};
pub use error::ApiError;
pub use registry::Registry;
pub use routes::router;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<EntityStore>,
    pub scanner: Arc<MentionScanner>,
    pub editor: Arc<ReferenceEditor>,
    pub counter: Arc<ReferenceCounter>,
    pub registry: Arc<Registry>,
    pub admins: Arc<AdminAllowList>,
}

impl AppState {
    /// Wire up state over an already-open backend.
    pub fn new(config: ServerConfig, backend: Arc<dyn DocumentStore>) -> Result<Self, ConfigError> {
        let policy = Arc::new(config.policy.build()?);
        let store = Arc::new(EntityStore::new(backend));

        Ok(Self {
            scanner: Arc::new(MentionScanner::new(store.clone(), policy.clone())),
            editor: Arc::new(ReferenceEditor::new(store.clone(), policy)),
            counter: Arc::new(ReferenceCounter::new(config.mentions.clone())),
            registry: Arc::new(Registry::standard()),
            admins: Arc::new(AdminAllowList::new(&config.auth.admin_emails)),
            store,
            config: Arc::new(config),
        })
    }

    /// Open the configured backend and wire up state.
    pub async fn open(config: ServerConfig) -> Result<Self, ConfigError> {
        let backend: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::open(&config.storage.data_dir).await?),
        };
        info!("Using {} document store", backend.name());
        Self::new(config, backend)
    }
}

/// Serve until ctrl-c.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr: SocketAddr = state.config.bind;
    let listener = TcpListener::bind(addr).await?;
    info!("Warbook server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Warbook server shutting down");
}
