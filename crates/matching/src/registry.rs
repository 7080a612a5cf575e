//! Connection-Registry – Alle lebenden Verbindungen und ihr Zustand
//!
//! Eine `Connection` existiert vom Socket-Open bis zum Trennen bzw. bis der
//! Reaper sie entfernt. Entfernt wird ausschliesslich ueber
//! `MatchingEngine::trennen`, damit Queues, Verzeichnis und Clash-Sitzungen
//! immer mit aufgeraeumt werden.

use lokin_core::types::ClientId;
use lokin_protocol::{Partner, SuchTyp};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::broadcast::ClientSender;
use lokin_protocol::ServerNachricht;

// ---------------------------------------------------------------------------
// Identitaet
// ---------------------------------------------------------------------------

/// Selbst gemeldete Identitaetsfelder einer Verbindung
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identitaet {
    pub name: Option<String>,
    pub email: Option<String>,
    pub prenom: Option<String>,
    pub nom: Option<String>,
    pub classe: Option<String>,
}

/// Leere Strings zaehlen als "nicht angegeben"
pub(crate) fn nicht_leer(wert: Option<&String>) -> Option<String> {
    wert.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Identitaet {
    /// Uebernimmt angegebene Felder, fehlende bleiben erhalten
    ///
    /// Sind `prenom` oder `nom` angegeben, wird der Anzeigename daraus gebildet.
    pub fn uebernehmen(
        &mut self,
        email: Option<&String>,
        prenom: Option<&String>,
        nom: Option<&String>,
        classe: Option<&String>,
    ) {
        let prenom = nicht_leer(prenom);
        let nom = nicht_leer(nom);

        let voller_name = format!(
            "{} {}",
            prenom.as_deref().unwrap_or_default(),
            nom.as_deref().unwrap_or_default()
        );
        let voller_name = voller_name.trim();
        if !voller_name.is_empty() {
            self.name = Some(voller_name.to_string());
        }

        self.felder_setzen(email, prenom.as_ref(), nom.as_ref(), classe);
    }

    /// Uebernimmt angegebene Felder ohne den Anzeigenamen anzufassen
    pub fn felder_setzen(
        &mut self,
        email: Option<&String>,
        prenom: Option<&String>,
        nom: Option<&String>,
        classe: Option<&String>,
    ) {
        if let Some(email) = nicht_leer(email) {
            self.email = Some(email);
        }
        if let Some(prenom) = nicht_leer(prenom) {
            self.prenom = Some(prenom);
        }
        if let Some(nom) = nicht_leer(nom) {
            self.nom = Some(nom);
        }
        if let Some(classe) = nicht_leer(classe) {
            self.classe = Some(classe);
        }
    }

    /// Setzt den Anzeigenamen (leer = Rueckfall auf `Utilisateur <id>`)
    pub fn name_setzen(&mut self, name: Option<&String>) {
        self.name = nicht_leer(name);
    }
}

// ---------------------------------------------------------------------------
// Suche
// ---------------------------------------------------------------------------

/// Aktive Suche einer Verbindung
#[derive(Debug, Clone, PartialEq)]
pub struct Suche {
    pub typ: SuchTyp,
    /// Akzeptierte Sprachen in Praeferenz-Reihenfolge (leer bei `cours`)
    pub sprachen: Vec<String>,
    pub matiere: Option<String>,
    pub niveau: Option<String>,
}

impl Suche {
    /// Gleicher Typ und mindestens eine gemeinsame Sprache
    pub fn passt_zu(&self, andere: &Suche) -> bool {
        self.typ == andere.typ && self.sprachen.iter().any(|s| andere.sprachen.contains(s))
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Eine lebende WebSocket-Verbindung
#[derive(Debug)]
pub struct Connection {
    pub id: ClientId,
    pub identitaet: Identitaet,
    /// Letzte bekannte Position (lat, lng)
    pub position: Option<(f64, f64)>,
    pub letzte_aktivitaet: Instant,
    /// Wall-Clock des letzten Positions-Updates (Unix-ms)
    pub letztes_positions_update: Option<i64>,
    pub sucht: bool,
    pub suche: Option<Suche>,
    pub ist_lehrer: bool,
    pub sender: ClientSender,
}

impl Connection {
    fn neu(sender: ClientSender, jetzt: Instant) -> Self {
        Self {
            id: sender.client_id,
            identitaet: Identitaet::default(),
            position: None,
            letzte_aktivitaet: jetzt,
            letztes_positions_update: None,
            sucht: false,
            suche: None,
            ist_lehrer: false,
            sender,
        }
    }

    /// Anzeigename mit Rueckfall auf die letzten vier Zeichen der ID
    pub fn anzeigename(&self) -> String {
        self.identitaet
            .name
            .clone()
            .unwrap_or_else(|| format!("Utilisateur {}", self.id.kurz()))
    }

    /// Identitaet so, wie sie dem Gegenueber im `matchFound` gezeigt wird
    pub fn als_partner(&self, ist_lehrer: Option<bool>) -> Partner {
        Partner {
            name: self.anzeigename(),
            prenom: self.identitaet.prenom.clone(),
            nom: self.identitaet.nom.clone(),
            classe: self.identitaet.classe.clone(),
            email: self.identitaet.email.clone(),
            is_teacher: ist_lehrer,
        }
    }

    /// Suche beenden (isSearching = false, Deskriptor weg)
    pub fn suche_beenden(&mut self) {
        self.sucht = false;
        self.suche = None;
    }

    /// Registriert und Transport offen
    pub fn ist_lebendig(&self) -> bool {
        !self.sender.ist_geschlossen()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Alle lebenden Verbindungen, indiziert nach ClientId
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    verbindungen: HashMap<ClientId, Connection>,
}

impl ConnectionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine neue Verbindung und gibt ihre ID zurueck
    pub fn registrieren(&mut self, sender: ClientSender, jetzt: Instant) -> ClientId {
        let connection = Connection::neu(sender, jetzt);
        let id = connection.id;
        self.verbindungen.insert(id, connection);
        tracing::debug!(client_id = %id, "Verbindung registriert");
        id
    }

    pub fn get(&self, id: &ClientId) -> Option<&Connection> {
        self.verbindungen.get(id)
    }

    pub fn get_mut(&mut self, id: &ClientId) -> Option<&mut Connection> {
        self.verbindungen.get_mut(id)
    }

    /// Nur fuer den Teardown der Engine
    pub(crate) fn entfernen(&mut self, id: &ClientId) -> Option<Connection> {
        self.verbindungen.remove(id)
    }

    /// Aktualisiert den Aktivitaets-Zeitstempel
    ///
    /// Gibt `false` zurueck wenn die Verbindung unbekannt ist.
    pub fn aktivitaet_melden(&mut self, id: &ClientId, jetzt: Instant) -> bool {
        match self.verbindungen.get_mut(id) {
            Some(c) => {
                c.letzte_aktivitaet = jetzt;
                true
            }
            None => false,
        }
    }

    /// Registriert **und** Transport nicht geschlossen
    pub fn ist_lebendig(&self, id: &ClientId) -> bool {
        self.verbindungen
            .get(id)
            .map(Connection::ist_lebendig)
            .unwrap_or(false)
    }

    /// Sendet eine Nachricht an eine Verbindung
    pub fn senden(&self, id: &ClientId, nachricht: ServerNachricht) -> bool {
        match self.verbindungen.get(id) {
            Some(c) => c.sender.senden(nachricht),
            None => {
                tracing::debug!(client_id = %id, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Verbindungen, die laenger als `schwelle` still waren
    pub fn inaktive(&self, jetzt: Instant, schwelle: Duration) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self
            .verbindungen
            .values()
            .filter(|c| jetzt.saturating_duration_since(c.letzte_aktivitaet) > schwelle)
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.verbindungen.values()
    }

    pub fn anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    pub fn enthaelt(&self, id: &ClientId) -> bool {
        self.verbindungen.contains_key(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> (ClientSender, tokio::sync::mpsc::Receiver<crate::broadcast::Ausgehend>) {
        ClientSender::kanal(ClientId::new(), 8)
    }

    #[test]
    fn registrieren_und_entfernen() {
        let mut registry = ConnectionRegistry::neu();
        let (s, _rx) = sender();
        let id = registry.registrieren(s, Instant::now());

        assert!(registry.enthaelt(&id));
        assert!(registry.ist_lebendig(&id));
        assert_eq!(registry.anzahl(), 1);

        assert!(registry.entfernen(&id).is_some());
        assert!(!registry.ist_lebendig(&id));
        assert!(registry.entfernen(&id).is_none());
    }

    #[test]
    fn geschlossener_transport_ist_nicht_lebendig() {
        let mut registry = ConnectionRegistry::neu();
        let (s, rx) = sender();
        let id = registry.registrieren(s, Instant::now());
        drop(rx);
        assert!(registry.enthaelt(&id));
        assert!(!registry.ist_lebendig(&id));
    }

    #[test]
    fn anzeigename_rueckfall() {
        let mut registry = ConnectionRegistry::neu();
        let (s, _rx) = sender();
        let id = registry.registrieren(s, Instant::now());
        let c = registry.get(&id).unwrap();
        assert_eq!(c.anzeigename(), format!("Utilisateur {}", id.kurz()));
    }

    #[test]
    fn identitaet_uebernehmen_bildet_namen() {
        let mut ident = Identitaet {
            name: Some("Alt".into()),
            email: Some("alt@example.org".into()),
            ..Default::default()
        };
        ident.uebernehmen(None, Some(&"Marie".to_string()), Some(&"Curie".to_string()), None);
        assert_eq!(ident.name.as_deref(), Some("Marie Curie"));
        assert_eq!(ident.email.as_deref(), Some("alt@example.org"));

        // Leere Felder aendern nichts
        ident.uebernehmen(Some(&"".to_string()), None, None, Some(&" ".to_string()));
        assert_eq!(ident.name.as_deref(), Some("Marie Curie"));
        assert!(ident.classe.is_none());
    }

    #[test]
    fn inaktive_nach_schwelle() {
        let mut registry = ConnectionRegistry::neu();
        let start = Instant::now();
        let (s1, _rx1) = sender();
        let (s2, _rx2) = sender();
        let alt = registry.registrieren(s1, start);
        let frisch = registry.registrieren(s2, start);

        registry.aktivitaet_melden(&frisch, start + Duration::from_secs(200));

        let inaktiv = registry.inaktive(start + Duration::from_secs(301), Duration::from_secs(300));
        assert_eq!(inaktiv, vec![alt]);
    }

    #[test]
    fn suche_passt_bei_gemeinsamer_sprache() {
        let a = Suche {
            typ: SuchTyp::Debat,
            sprachen: vec!["fr".into(), "en".into()],
            matiere: None,
            niveau: None,
        };
        let b = Suche {
            sprachen: vec!["en".into()],
            ..a.clone()
        };
        let c = Suche {
            typ: SuchTyp::Chat,
            ..b.clone()
        };
        assert!(a.passt_zu(&b));
        assert!(!a.passt_zu(&c));
    }
}
