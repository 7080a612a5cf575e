//! Message-Dispatcher – Routet Client-Nachrichten an die Engine
//!
//! Jeder eingehende Text-Frame zaehlt als Aktivitaet. Danach wird er als
//! `ClientNachricht` gelesen und an den passenden Engine-Handler gegeben.
//!
//! ## Fehlerbehandlung
//! - Nicht lesbares JSON / falsche Feldtypen: `warn`-Log, `error` an den Absender
//! - Fehlende Pflichtfelder, unbekannte `matchId`: `error` an den Absender
//! - Unbekannter `type`: ignoriert, keine Antwort
//!
//! Die Verbindung bleibt in allen Faellen bestehen.

use lokin_core::types::ClientId;
use lokin_protocol::ClientNachricht;
use std::time::Instant;

use crate::engine::MatchingEngine;
use crate::error::{MatchingError, MatchingResult};

/// Verarbeitet einen eingehenden Text-Frame einer Verbindung
pub fn text_verarbeiten(engine: &mut MatchingEngine, client_id: ClientId, text: &str, jetzt: Instant) {
    if !engine.aktivitaet_melden(&client_id, jetzt) {
        tracing::debug!(client_id = %client_id, "Nachricht von unbekannter Verbindung verworfen");
        return;
    }

    let nachricht = match ClientNachricht::from_json(text) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(client_id = %client_id, fehler = %e, "Ungueltige Nachricht");
            engine.fehler_senden(&client_id, &MatchingError::ungueltig(e.to_string()));
            return;
        }
    };

    let typ = nachricht.typ_name();
    tracing::trace!(client_id = %client_id, typ, "Nachricht empfangen");

    if let Err(e) = dispatch(engine, client_id, nachricht, jetzt) {
        tracing::warn!(client_id = %client_id, typ, fehler = %e, "Nachricht abgelehnt");
        engine.fehler_senden(&client_id, &e);
    }
}

/// Ruft den Handler fuer eine gelesene Nachricht auf
pub fn dispatch(
    engine: &mut MatchingEngine,
    client_id: ClientId,
    nachricht: ClientNachricht,
    jetzt: Instant,
) -> MatchingResult<()> {
    match nachricht {
        ClientNachricht::UpdatePosition(update) => engine.position_aktualisieren(&client_id, &update),
        ClientNachricht::StartSearch(anfrage) => engine.suche_starten(&client_id, &anfrage, jetzt),
        ClientNachricht::StopSearch => engine.suche_stoppen(&client_id),
        ClientNachricht::TeacherAvailable(anfrage) => engine.lehrer_verfuegbar(&client_id, &anfrage),
        ClientNachricht::TeacherUnavailable(anfrage) => {
            engine.lehrer_nicht_verfuegbar(&client_id, &anfrage)
        }
        ClientNachricht::ClashAccepted(anfrage) => engine.clash_annehmen(&client_id, &anfrage, jetzt),
        ClientNachricht::ClashRefused(anfrage) => engine.clash_ablehnen(&client_id, &anfrage),
        ClientNachricht::RequestUserList => {
            engine.benutzerliste_senden(&client_id);
            Ok(())
        }
        ClientNachricht::Unbekannt => {
            tracing::debug!(client_id = %client_id, "Unbekannter Nachrichtentyp ignoriert");
            Ok(())
        }
    }
}
