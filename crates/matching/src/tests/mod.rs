//! Szenario-Tests fuer die Matching-Engine
//!
//! Die Tests fahren die Engine ueber den Dispatcher mit echten JSON-Frames
//! und beobachten die Send-Queues der Test-Clients.

mod clash_tests;
mod presence_tests;

use lokin_core::types::{ClientId, MatchId};
use lokin_observability::LokinMetrics;
use lokin_protocol::control::MatchGefunden;
use lokin_protocol::ServerNachricht;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::broadcast::{Ausgehend, ClientSender};
use crate::dispatcher;
use crate::engine::{EngineKonfig, MatchingEngine};

/// Ein simulierter Browser-Client
pub(crate) struct TestClient {
    pub id: ClientId,
    pub rx: mpsc::Receiver<Ausgehend>,
}

impl TestClient {
    /// Alle bisher eingegangenen Eintraege der Send-Queue
    pub fn alles(&mut self) -> Vec<Ausgehend> {
        let mut eintraege = Vec::new();
        while let Ok(e) = self.rx.try_recv() {
            eintraege.push(e);
        }
        eintraege
    }

    /// Nur die JSON-Nachrichten
    pub fn nachrichten(&mut self) -> Vec<ServerNachricht> {
        self.alles()
            .into_iter()
            .filter_map(|e| match e {
                Ausgehend::Nachricht(n) => Some(n),
                Ausgehend::Schliessen => None,
            })
            .collect()
    }

    /// Typnamen der eingegangenen Nachrichten
    pub fn typen(&mut self) -> Vec<&'static str> {
        self.nachrichten().iter().map(|n| n.typ_name()).collect()
    }
}

pub(crate) fn metriken() -> LokinMetrics {
    LokinMetrics::neu().expect("Metriken muessen sich anlegen lassen")
}

pub(crate) fn engine() -> MatchingEngine {
    MatchingEngine::neu(EngineKonfig::default(), metriken())
}

/// Verbindet einen Client und verwirft die Begruessung
pub(crate) fn verbinden(engine: &mut MatchingEngine, jetzt: Instant) -> TestClient {
    let id = ClientId::new();
    let (sender, rx) = ClientSender::kanal(id, 256);
    engine.verbinden(sender, jetzt);
    let mut client = TestClient { id, rx };
    client.alles();
    client
}

/// Schickt einen JSON-Frame durch den Dispatcher
pub(crate) fn senden(engine: &mut MatchingEngine, client: &TestClient, json: &str, jetzt: Instant) {
    dispatcher::text_verarbeiten(engine, client.id, json, jetzt);
}

pub(crate) fn suche(typ: &str, sprachen: &[&str]) -> String {
    let sprachen: Vec<String> = sprachen.iter().map(|s| format!("\"{s}\"")).collect();
    format!(
        r#"{{"type":"startSearch","searchType":"{typ}","languages":[{}]}}"#,
        sprachen.join(",")
    )
}

pub(crate) fn annehmen(match_id: MatchId) -> String {
    format!(r#"{{"type":"clashAccepted","matchId":"{}"}}"#, match_id.inner())
}

pub(crate) fn ablehnen(match_id: MatchId) -> String {
    format!(r#"{{"type":"clashRefused","matchId":"{}"}}"#, match_id.inner())
}

/// Erstes `matchFound` aus einer Nachrichtenliste
pub(crate) fn match_gefunden(nachrichten: &[ServerNachricht]) -> Option<MatchGefunden> {
    nachrichten.iter().find_map(|n| match n {
        ServerNachricht::MatchFound(m) => Some(m.clone()),
        _ => None,
    })
}

/// Texte aller `error`-Frames
pub(crate) fn fehler(nachrichten: &[ServerNachricht]) -> Vec<String> {
    nachrichten
        .iter()
        .filter_map(|n| match n {
            ServerNachricht::Error(h) => Some(h.message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn verbinden_sendet_client_id() {
    let mut engine = engine();
    let id = ClientId::new();
    let (sender, mut rx) = ClientSender::kanal(id, 8);

    let vergeben = engine.verbinden(sender, Instant::now());
    assert_eq!(vergeben, id);

    match rx.try_recv() {
        Ok(Ausgehend::Nachricht(ServerNachricht::Connected(v))) => {
            assert_eq!(v.client_id, id);
            assert_eq!(v.message, "Connexion établie");
        }
        andere => panic!("Erwartet connected, war {andere:?}"),
    }
}

#[test]
fn unbekannter_typ_wird_ignoriert() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, r#"{"type":"ping","x":1}"#, jetzt);
    assert!(a.nachrichten().is_empty());
}

#[test]
fn kaputtes_json_ergibt_fehler_und_verbindung_bleibt() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, "{nicht json", jetzt);
    let f = fehler(&a.nachrichten());
    assert_eq!(f.len(), 1);
    assert!(f[0].starts_with("Message invalide"));
    assert!(engine.registry().enthaelt(&a.id));
}
