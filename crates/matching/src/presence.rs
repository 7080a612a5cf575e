//! Presence – Snapshot aller positionierten Verbindungen
//!
//! Nach jedem Positions-Update und nach jedem Trennen geht der komplette
//! Snapshot an alle lebenden Verbindungen. Ein Client kann ihn zusaetzlich
//! per `requestUserList` anfordern.

use lokin_core::types::ClientId;
use lokin_protocol::{BenutzerEintrag, ServerNachricht};

use crate::registry::ConnectionRegistry;

/// Gueltiger Wertebereich fuer Koordinaten
pub fn position_gueltig(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Alle positionierten Verbindungen, sortiert nach Update-Zeit und ID
pub fn schnappschuss(registry: &ConnectionRegistry) -> Vec<BenutzerEintrag> {
    let mut eintraege: Vec<BenutzerEintrag> = registry
        .iter()
        .filter_map(|c| {
            let (lat, lng) = c.position?;
            Some(BenutzerEintrag {
                id: c.id,
                name: c.anzeigename(),
                lat,
                lng,
                last_update_time: c.letztes_positions_update.unwrap_or_default(),
            })
        })
        .collect();
    eintraege.sort_by(|a, b| {
        a.last_update_time
            .cmp(&b.last_update_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    eintraege
}

/// Sendet den Snapshot an alle lebenden Verbindungen
///
/// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
pub fn an_alle_verteilen(registry: &ConnectionRegistry) -> usize {
    let nachricht = ServerNachricht::benutzer_liste(schnappschuss(registry));
    let mut gesendet = 0;
    for c in registry.iter().filter(|c| c.ist_lebendig()) {
        if c.sender.senden(nachricht.clone()) {
            gesendet += 1;
        }
    }
    tracing::trace!(empfaenger = gesendet, "userList verteilt");
    gesendet
}

/// Sendet den Snapshot nur an eine Verbindung
pub fn an_einen_senden(registry: &ConnectionRegistry, id: &ClientId) -> bool {
    registry.senden(id, ServerNachricht::benutzer_liste(schnappschuss(registry)))
}
