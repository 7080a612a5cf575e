//! Clash-Koordinator – Beidseitige Annahme von Debatten-Matches
//!
//! ## Zustaende
//! ```text
//! pending --beide angenommen--> confirmed --Gnadenfrist--> geloescht
//!    |
//!    +--Ablehnung / Trennen / Timeout--> geloescht
//! ```
//!
//! Der Koordinator verwaltet nur die Sitzungen. Benachrichtigungen und
//! Suchzustand der Teilnehmer setzt die Engine.

use lokin_core::types::{ClientId, MatchId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{MatchingError, MatchingResult};
use crate::meet::MeetRaum;

// ---------------------------------------------------------------------------
// ClashSession
// ---------------------------------------------------------------------------

/// Eine Debatten-Sitzung zwischen zwei Teilnehmern
#[derive(Debug, Clone)]
pub struct ClashSession {
    pub match_id: MatchId,
    pub teilnehmer: [ClientId; 2],
    pub angenommen: [bool; 2],
    /// Erste gelieferte Debattenfrage gewinnt
    pub debattenfrage: Option<String>,
    pub raum: MeetRaum,
    pub erstellt: Instant,
    pub bestaetigt_um: Option<Instant>,
}

impl ClashSession {
    fn index_von(&self, id: &ClientId) -> Option<usize> {
        self.teilnehmer.iter().position(|t| t == id)
    }

    /// Der jeweils andere Teilnehmer
    pub fn partner_von(&self, id: &ClientId) -> Option<ClientId> {
        self.index_von(id).map(|i| self.teilnehmer[1 - i])
    }

    pub fn ist_bestaetigt(&self) -> bool {
        self.bestaetigt_um.is_some()
    }
}

/// Ergebnis einer Annahme
#[derive(Debug, Clone)]
pub enum Annahme {
    /// Warten auf den Partner
    Wartend,
    /// Beide haben angenommen (Link wird freigegeben)
    Bestaetigt(ClashSession),
    /// Sitzung war schon bestaetigt, nichts zu tun
    BereitsBestaetigt,
}

// ---------------------------------------------------------------------------
// ClashCoordinator
// ---------------------------------------------------------------------------

/// Alle offenen und bestaetigten Clash-Sitzungen
#[derive(Debug, Default)]
pub struct ClashCoordinator {
    sitzungen: HashMap<MatchId, ClashSession>,
}

impl ClashCoordinator {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine neue offene Sitzung an
    pub fn erstellen(
        &mut self,
        match_id: MatchId,
        a: ClientId,
        b: ClientId,
        raum: MeetRaum,
        jetzt: Instant,
    ) {
        self.sitzungen.insert(
            match_id,
            ClashSession {
                match_id,
                teilnehmer: [a, b],
                angenommen: [false, false],
                debattenfrage: None,
                raum,
                erstellt: jetzt,
                bestaetigt_um: None,
            },
        );
        tracing::debug!(match_id = %match_id, a = %a, b = %b, "Clash-Sitzung angelegt");
    }

    /// Teilnehmer nimmt an
    pub fn annehmen(
        &mut self,
        match_id: &MatchId,
        id: &ClientId,
        frage: Option<&String>,
        jetzt: Instant,
    ) -> MatchingResult<Annahme> {
        let sitzung = self
            .sitzungen
            .get_mut(match_id)
            .ok_or(MatchingError::MatchNichtGefunden)?;
        let index = sitzung.index_von(id).ok_or(MatchingError::NichtBeteiligt)?;

        if sitzung.ist_bestaetigt() {
            return Ok(Annahme::BereitsBestaetigt);
        }

        sitzung.angenommen[index] = true;
        if sitzung.debattenfrage.is_none() {
            sitzung.debattenfrage = frage
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string);
        }

        if sitzung.angenommen.iter().all(|a| *a) {
            sitzung.bestaetigt_um = Some(jetzt);
            tracing::info!(match_id = %match_id, "Clash von beiden Seiten angenommen");
            Ok(Annahme::Bestaetigt(sitzung.clone()))
        } else {
            Ok(Annahme::Wartend)
        }
    }

    /// Teilnehmer lehnt ab. Gibt den zu benachrichtigenden Partner zurueck.
    ///
    /// Die Sitzung wird sofort geloescht.
    pub fn ablehnen(&mut self, match_id: &MatchId, id: &ClientId) -> MatchingResult<ClientId> {
        let sitzung = self
            .sitzungen
            .get(match_id)
            .ok_or(MatchingError::MatchNichtGefunden)?;
        let partner = sitzung.partner_von(id).ok_or(MatchingError::NichtBeteiligt)?;
        if sitzung.ist_bestaetigt() {
            return Err(MatchingError::ClashBereitsBestaetigt);
        }

        self.sitzungen.remove(match_id);
        tracing::info!(match_id = %match_id, client_id = %id, "Clash abgelehnt");
        Ok(partner)
    }

    /// Offene Sitzungen, an denen `id` beteiligt ist
    pub fn offene_von(&self, id: &ClientId) -> Vec<MatchId> {
        self.sitzungen
            .values()
            .filter(|s| !s.ist_bestaetigt() && s.teilnehmer.contains(id))
            .map(|s| s.match_id)
            .collect()
    }

    /// Entfernt bestaetigte Sitzungen, an denen `id` beteiligt ist
    pub fn bestaetigte_entfernen_von(&mut self, id: &ClientId) -> usize {
        let vorher = self.sitzungen.len();
        self.sitzungen
            .retain(|_, s| !(s.ist_bestaetigt() && s.teilnehmer.contains(id)));
        vorher - self.sitzungen.len()
    }

    /// Loescht bestaetigte Sitzungen nach Ablauf der Gnadenfrist
    pub fn abgelaufene_entfernen(&mut self, jetzt: Instant, gnadenfrist: Duration) -> usize {
        let vorher = self.sitzungen.len();
        self.sitzungen.retain(|_, s| match s.bestaetigt_um {
            Some(t) => jetzt.saturating_duration_since(t) < gnadenfrist,
            None => true,
        });
        vorher - self.sitzungen.len()
    }

    /// Entnimmt offene Sitzungen, die aelter als `timeout` sind
    pub fn zeitueberschreitungen(&mut self, jetzt: Instant, timeout: Duration) -> Vec<ClashSession> {
        let abgelaufen: Vec<MatchId> = self
            .sitzungen
            .values()
            .filter(|s| !s.ist_bestaetigt() && jetzt.saturating_duration_since(s.erstellt) >= timeout)
            .map(|s| s.match_id)
            .collect();

        abgelaufen
            .iter()
            .filter_map(|id| self.sitzungen.remove(id))
            .collect()
    }

    pub fn get(&self, match_id: &MatchId) -> Option<&ClashSession> {
        self.sitzungen.get(match_id)
    }

    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }

    /// Kommt die ID in irgendeiner Sitzung vor?
    pub fn enthaelt(&self, id: &ClientId) -> bool {
        self.sitzungen.values().any(|s| s.teilnehmer.contains(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
