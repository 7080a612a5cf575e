//! WebSocket-Server – Bindet den Listener und nimmt Upgrades an
//!
//! Der Browser-Client verbindet sich auf `/` oder `/ws`. Jede Verbindung
//! haelt eine Semaphore-Permit bis zum Ende ihres Tasks; ohne freien Platz
//! wird das Upgrade mit 503 abgelehnt.

use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use lokin_observability::{request_timing_layer, timing_middleware, LokinMetrics};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::connection::verbindung_verarbeiten;
use crate::service::EngineHandle;

/// Geteilter Zustand der Upgrade-Handler
#[derive(Clone)]
pub struct WsState {
    pub handle: EngineHandle,
    pub metriken: LokinMetrics,
    pub max_clients: usize,
    pub send_queue_groesse: usize,
    pub shutdown_rx: watch::Receiver<bool>,
    plaetze: Arc<Semaphore>,
}

impl WsState {
    pub fn neu(
        handle: EngineHandle,
        metriken: LokinMetrics,
        max_clients: usize,
        send_queue_groesse: usize,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            handle,
            metriken,
            max_clients,
            send_queue_groesse,
            shutdown_rx,
            plaetze: Arc::new(Semaphore::new(max_clients)),
        }
    }

    /// Reserviert einen Verbindungsplatz, `None` wenn der Server voll ist
    pub fn platz_reservieren(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.plaetze).try_acquire_owned().ok()
    }

    /// Anzahl der noch freien Plaetze
    pub fn freie_plaetze(&self) -> usize {
        self.plaetze.available_permits()
    }
}

/// Router mit den WebSocket-Endpunkten
pub fn ws_router(state: WsState) -> Router {
    let metriken = state.metriken.clone();
    Router::new()
        .route("/", get(ws_upgrade))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
        .layer(request_timing_layer())
}

async fn ws_upgrade(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    let Some(platz) = state.platz_reservieren() else {
        tracing::warn!(max = state.max_clients, "Server voll – Verbindung abgelehnt");
        return (StatusCode::SERVICE_UNAVAILABLE, "Serveur complet").into_response();
    };

    ws.on_upgrade(move |socket| async move {
        verbindung_verarbeiten(
            socket,
            state.handle,
            state.send_queue_groesse,
            state.shutdown_rx,
        )
        .await;
        drop(platz);
    })
}

// ---------------------------------------------------------------------------
// WsServer
// ---------------------------------------------------------------------------

/// WebSocket-Server fuer die Browser-Clients
pub struct WsServer {
    state: WsState,
    bind_addr: SocketAddr,
}

impl WsServer {
    pub fn neu(state: WsState, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den Listener und bedient Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "WebSocket-Server gestartet");

        axum::serve(listener, ws_router(self.state))
            .with_graceful_shutdown(async move {
                while shutdown_rx.changed().await.is_ok() {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            })
            .await?;

        tracing::info!("WebSocket-Server gestoppt");
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
