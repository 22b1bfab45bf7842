//! HTTP transport server.
//!
//! Two verbs keyed by command token:
//!
//! - `PUT /commands/{token}` stores an Arrow IPC record as-is
//! - `GET /commands/{token}` decodes the stored record, runs the compute
//!   capability and streams the encoded result back
//!
//! # Thread Safety
//!
//! Every request runs in its own tokio task. The only shared mutable state is
//! the [`CommandStore`], whose lock is held for map access only. Decoding and
//! computing run on the blocking pool, outside the lock.

mod handler;

use crate::codec::{ArrayCodec, WireRecord};
use crate::compute::Compute;
use crate::config::{ServerConfig, TransportConfig};
use crate::store::CommandStore;
use crate::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use handler::{handle_get, handle_health, handle_put};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Transport server holding the command store and one compute capability.
pub struct TransportServer<F> {
    store: CommandStore,
    compute: F,
}

impl<F: Compute> TransportServer<F> {
    pub fn new(compute: F) -> Self {
        Self {
            store: CommandStore::new(),
            compute,
        }
    }

    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    /// Store an uploaded record. No decoding happens here.
    pub fn handle_put(&self, token: &str, record: WireRecord) {
        info!("Processing PUT request for command: {}", token);
        self.store.put(token, record);
    }

    /// Decode the stored record, compute, and encode the result.
    pub fn handle_get(&self, token: &str) -> Result<WireRecord> {
        info!("Processing GET request for command: {}", token);

        let record = self.store.get(token)?;
        let matrices = ArrayCodec::decode(&record)?;
        debug!(
            "Decoded arrays for {}: {:?}",
            token,
            matrices.names().collect::<Vec<_>>()
        );

        let result = (self.compute)(&matrices)?;
        info!("Computation completed for command: {}", token);

        ArrayCodec::encode(&result)
    }

    /// Build the axum router for this server.
    pub fn router(self: Arc<Self>, config: &ServerConfig) -> Router {
        Router::new()
            .route(TransportConfig::HEALTH_ROUTE, get(handle_health))
            .route(
                TransportConfig::COMMANDS_ROUTE,
                put(handle_put::<F>).get(handle_get::<F>),
            )
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Bind and serve in a background task.
    ///
    /// Returns a handle with the actual bound address (useful when port=0).
    pub async fn serve(self: Arc<Self>, config: &ServerConfig) -> Result<ServerHandle> {
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let app = self.router(config);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        info!("Transport server listening on {}", actual_addr);

        let task_handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Transport server error: {}", e);
            }
            info!("Transport server on {} stopped", actual_addr);
        });

        Ok(ServerHandle {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }
}

/// Handle to a running transport server. Dropping shuts down the server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL a [`TransportClient`](crate::TransportClient) can connect to.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and let in-flight requests finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Shut down and wait for the serve task to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}
