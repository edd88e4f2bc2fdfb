use std::sync::Arc;

use planpoker_db::{DbPool, PgSessionStore, SessionStore};

use crate::config::ServerConfig;
use crate::poker::SessionCoordinator;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by the REST handlers.
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    /// Live connections and room membership.
    pub ws_manager: Arc<WsManager>,
    /// Session store seen by the real-time layer.
    pub store: Arc<dyn SessionStore>,
    /// Real-time session coordinator.
    pub coordinator: Arc<SessionCoordinator>,
}

impl AppState {
    /// Wire the PostgreSQL-backed store, a fresh connection manager and the
    /// coordinator on top of them.
    pub fn new(pool: DbPool, config: ServerConfig) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));
        let ws_manager = Arc::new(WsManager::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&ws_manager),
        ));
        Self {
            pool,
            config: Arc::new(config),
            ws_manager,
            store,
            coordinator,
        }
    }
}
