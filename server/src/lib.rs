//! lokin-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Matching-Service, WebSocket-Server und
//! Observability-Server zu einem lauffaehigen Prozess.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use lokin_matching::{MatchingEngine, MatchingService, WsServer, WsState};
use lokin_observability::{observability_server_starten, HealthState, LokinMetrics};
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Health-Zustand anlegen
    /// 2. Matching-Service (Engine + Reaper) starten
    /// 3. Observability-Server starten (falls aktiviert)
    /// 4. WebSocket-Listener starten
    /// 5. Auf Ctrl-C / SIGTERM warten, dann alles ueber den watch-Kanal stoppen
    pub async fn starten(self) -> Result<()> {
        let (ws_addr, obs_addr) = self.config.socket_adressen()?;
        let vermittlung = &self.config.vermittlung;

        tracing::info!(
            server_name = %self.config.server.name,
            websocket = %ws_addr,
            max_clients = self.config.server.max_clients,
            leerlauf_timeout_sek = vermittlung.leerlauf_timeout_sek,
            "Server startet"
        );

        let metriken = LokinMetrics::neu()?;
        let health = HealthState::neu(metriken.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Matching-Service
        let engine = MatchingEngine::neu(vermittlung.engine_konfig(), metriken.clone());
        let (service, handle) = MatchingService::neu(engine, vermittlung.reaper_intervall());
        let service_task = {
            let health = health.clone();
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let engine = service.starten(rx).await;
                health.engine_status_setzen(false);
                tracing::info!(
                    verbleibend = engine.registry().anzahl(),
                    "Engine beendet"
                );
            })
        };

        // Observability
        let obs_task = if self.config.observability.aktiviert {
            let rx = shutdown_rx.clone();
            let health = health.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, health, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server fehlgeschlagen");
                }
            }))
        } else {
            tracing::info!("Observability-Server deaktiviert");
            None
        };

        // WebSocket
        let state = WsState::neu(
            handle,
            metriken,
            self.config.server.max_clients as usize,
            vermittlung.send_queue_groesse.max(1),
            shutdown_rx.clone(),
        );
        let ws_server = WsServer::neu(state, ws_addr);
        let mut ws_task = tokio::spawn(ws_server.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        let vorzeitig = tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                None
            }
            ergebnis = &mut ws_task => Some(ergebnis),
        };

        let _ = shutdown_tx.send(true);

        let ws_ergebnis = match vorzeitig {
            Some(ergebnis) => ergebnis,
            None => ws_task.await,
        };
        if let Err(e) = service_task.await {
            tracing::error!(fehler = %e, "Matching-Service abgebrochen");
        }
        if let Some(task) = obs_task {
            let _ = task.await;
        }

        match ws_ergebnis {
            Ok(Ok(())) => {
                tracing::info!("Server beendet");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow::anyhow!("WebSocket-Server fehlgeschlagen: {e}")),
            Err(e) => Err(anyhow::anyhow!("WebSocket-Task abgebrochen: {e}")),
        }
    }
}

/// Wartet auf Ctrl-C oder SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler nicht verfuegbar");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "SIGTERM-Handler nicht verfuegbar");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
