//! Matching-Service – Der Task, dem die Engine gehoert
//!
//! Socket-Tasks schicken `EngineBefehl`e ueber eine mpsc-Queue. Der
//! Reaper-Tick ist ein Zweig derselben `select!`-Schleife, dadurch laufen
//! Handler und Reaper nie verschraenkt.

use lokin_core::types::ClientId;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::broadcast::ClientSender;
use crate::dispatcher;
use crate::engine::MatchingEngine;

/// Groesse der Befehls-Queue zur Engine
pub const BEFEHL_QUEUE_GROESSE: usize = 1024;

/// Befehle der Socket-Tasks an die Engine
#[derive(Debug)]
pub enum EngineBefehl {
    /// Neue Verbindung, die ID steckt im Sender
    Verbunden { sender: ClientSender },
    /// Text-Frame vom Client
    Nachricht { client_id: ClientId, text: String },
    /// Socket geschlossen
    Getrennt { client_id: ClientId },
}

/// Engine-Task nicht mehr erreichbar
#[derive(Debug, thiserror::Error)]
#[error("Matching-Engine nicht erreichbar")]
pub struct EngineGestoppt;

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Clonebarer Zugang der Socket-Tasks zur Engine
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineBefehl>,
}

impl EngineHandle {
    async fn senden(&self, befehl: EngineBefehl) -> Result<(), EngineGestoppt> {
        self.tx.send(befehl).await.map_err(|_| EngineGestoppt)
    }

    pub async fn verbunden(&self, sender: ClientSender) -> Result<(), EngineGestoppt> {
        self.senden(EngineBefehl::Verbunden { sender }).await
    }

    pub async fn nachricht(&self, client_id: ClientId, text: String) -> Result<(), EngineGestoppt> {
        self.senden(EngineBefehl::Nachricht { client_id, text }).await
    }

    pub async fn getrennt(&self, client_id: ClientId) -> Result<(), EngineGestoppt> {
        self.senden(EngineBefehl::Getrennt { client_id }).await
    }
}

// ---------------------------------------------------------------------------
// MatchingService
// ---------------------------------------------------------------------------

/// Besitzt die Engine und verarbeitet Befehle nacheinander
pub struct MatchingService {
    engine: MatchingEngine,
    rx: mpsc::Receiver<EngineBefehl>,
    reaper_intervall: Duration,
}

impl MatchingService {
    /// Erstellt den Service und das zugehoerige Handle
    pub fn neu(engine: MatchingEngine, reaper_intervall: Duration) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(BEFEHL_QUEUE_GROESSE);
        (
            Self {
                engine,
                rx,
                reaper_intervall,
            },
            EngineHandle { tx },
        )
    }

    /// Hauptschleife
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt oder alle Handles
    /// weg sind. Gibt die Engine zurueck.
    pub async fn starten(mut self, mut shutdown_rx: watch::Receiver<bool>) -> MatchingEngine {
        let mut reaper = tokio::time::interval(self.reaper_intervall);
        reaper.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Erster Tick kommt sofort
        reaper.tick().await;

        tracing::info!(
            reaper_intervall_sek = self.reaper_intervall.as_secs(),
            leerlauf_timeout_sek = self.engine.konfig().leerlauf_timeout.as_secs(),
            "Matching-Service gestartet"
        );

        loop {
            tokio::select! {
                befehl = self.rx.recv() => {
                    match befehl {
                        Some(befehl) => self.befehl_ausfuehren(befehl),
                        None => {
                            tracing::debug!("Alle Engine-Handles geschlossen");
                            break;
                        }
                    }
                }

                _ = reaper.tick() => {
                    let getrennt = self.engine.leerlauf_pruefen(std::time::Instant::now());
                    if getrennt > 0 {
                        tracing::info!(anzahl = getrennt, "Reaper: inaktive Verbindungen getrennt");
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Matching-Service: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Matching-Service gestoppt");
        self.engine
    }

    fn befehl_ausfuehren(&mut self, befehl: EngineBefehl) {
        let jetzt = std::time::Instant::now();
        match befehl {
            EngineBefehl::Verbunden { sender } => {
                self.engine.verbinden(sender, jetzt);
            }
            EngineBefehl::Nachricht { client_id, text } => {
                dispatcher::text_verarbeiten(&mut self.engine, client_id, &text, jetzt);
            }
            EngineBefehl::Getrennt { client_id } => {
                self.engine.trennen(&client_id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Ausgehend;
    use crate::engine::EngineKonfig;
    use lokin_observability::LokinMetrics;
    use lokin_protocol::ServerNachricht;

    fn service() -> (MatchingService, EngineHandle) {
        let engine = MatchingEngine::neu(EngineKonfig::default(), LokinMetrics::neu().unwrap());
        MatchingService::neu(engine, Duration::from_secs(30))
    }

    async fn naechste(rx: &mut mpsc::Receiver<Ausgehend>) -> ServerNachricht {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(Ausgehend::Nachricht(n))) => n,
            andere => panic!("Erwartet Nachricht, war {andere:?}"),
        }
    }

    #[tokio::test]
    async fn befehle_werden_der_reihe_nach_verarbeitet() {
        let (service, handle) = service();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.starten(shutdown_rx));

        let id = ClientId::new();
        let (sender, mut rx) = ClientSender::kanal(id, 16);
        handle.verbunden(sender).await.unwrap();
        handle
            .nachricht(id, r#"{"type":"requestUserList"}"#.to_string())
            .await
            .unwrap();
        handle.nachricht(id, "kaputt".to_string()).await.unwrap();

        assert!(matches!(naechste(&mut rx).await, ServerNachricht::Connected(_)));
        assert!(matches!(naechste(&mut rx).await, ServerNachricht::UserList(_)));
        assert!(matches!(naechste(&mut rx).await, ServerNachricht::Error(_)));

        handle.getrennt(id).await.unwrap();
        // Ohne Handles arbeitet der Service die Queue ab und endet
        drop(handle);
        let engine = task.await.unwrap();
        assert_eq!(engine.registry().anzahl(), 0);
    }

    #[tokio::test]
    async fn handle_nach_shutdown_meldet_fehler() {
        let (service, handle) = service();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(service.starten(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert!(handle.getrennt(ClientId::new()).await.is_err());
    }
}
