//! Control-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht ist ein JSON-Objekt mit Diskriminator `type`
//! - Tagged Enums fuer typsichere Nachrichtentypen
//! - Feldnamen im camelCase des Browser-Clients (`searchType`, `matchId`, ...)
//! - Unbekannte `type`-Werte landen in `ClientNachricht::Unbekannt`

use lokin_core::types::{ClientId, MatchId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Such-Typen
// ---------------------------------------------------------------------------

/// Art der Suche (`searchType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuchTyp {
    /// Debatte ("Clash") – erfordert beidseitige Annahme
    Debat,
    /// Freies Gespraech
    Chat,
    /// Nachhilfe bei einem Lehrer
    Cours,
}

impl SuchTyp {
    /// Wire-Darstellung, wie sie auch in Queue-Schluesseln erscheint
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Debat => "debat",
            Self::Chat => "chat",
            Self::Cours => "cours",
        }
    }

    /// Debatten laufen ueber den Clash-Handshake
    pub fn ist_clash(&self) -> bool {
        matches!(self, Self::Debat)
    }
}

impl std::fmt::Display for SuchTyp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

// ---------------------------------------------------------------------------
// Eingehende Nachrichten (Client -> Server)
// ---------------------------------------------------------------------------

/// Positions-Update inkl. Identitaetsfeldern
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub prenom: Option<String>,
    pub nom: Option<String>,
    pub classe: Option<String>,
}

/// Suche starten (Peer-Matching oder Lehrer-Suche)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SucheStarten {
    pub search_type: Option<SuchTyp>,
    /// Einzelne Sprache (aeltere Clients)
    pub language: Option<String>,
    /// Liste akzeptierter Sprachen in Praeferenz-Reihenfolge
    pub languages: Option<Vec<String>>,
    pub matiere: Option<String>,
    pub niveau: Option<String>,
    pub email: Option<String>,
    pub prenom: Option<String>,
    pub nom: Option<String>,
    pub classe: Option<String>,
}

impl SucheStarten {
    /// Fuehrt `languages` und `language` zusammen
    ///
    /// Reihenfolge bleibt erhalten, Duplikate und leere Eintraege fallen weg.
    pub fn sprachen(&self) -> Vec<String> {
        let mut sprachen: Vec<String> = Vec::new();
        let kandidaten = self
            .languages
            .iter()
            .flatten()
            .chain(self.language.iter());

        for sprache in kandidaten {
            let sprache = sprache.trim();
            if sprache.is_empty() || sprachen.iter().any(|s| s == sprache) {
                continue;
            }
            sprachen.push(sprache.to_string());
        }
        sprachen
    }
}

/// Lehrer meldet sich fuer ein Fach verfuegbar
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LehrerVerfuegbar {
    pub matiere: Option<String>,
    pub email: Option<String>,
    pub prenom: Option<String>,
    pub nom: Option<String>,
}

/// Lehrer meldet sich fuer ein Fach ab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LehrerNichtVerfuegbar {
    pub matiere: Option<String>,
}

/// Clash annehmen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClashAnnahme {
    pub match_id: Option<MatchId>,
    pub debate_question: Option<String>,
}

/// Clash ablehnen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClashAblehnung {
    pub match_id: Option<MatchId>,
}

/// Alle Nachrichten die ein Client senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientNachricht {
    UpdatePosition(PositionUpdate),
    StartSearch(SucheStarten),
    StopSearch,
    TeacherAvailable(LehrerVerfuegbar),
    TeacherUnavailable(LehrerNichtVerfuegbar),
    ClashAccepted(ClashAnnahme),
    ClashRefused(ClashAblehnung),
    RequestUserList,
    /// Unbekannter Diskriminator – wird stillschweigend ignoriert
    #[serde(other)]
    Unbekannt,
}

impl ClientNachricht {
    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Name des Nachrichtentyps fuer Logs
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::UpdatePosition(_) => "updatePosition",
            Self::StartSearch(_) => "startSearch",
            Self::StopSearch => "stopSearch",
            Self::TeacherAvailable(_) => "teacherAvailable",
            Self::TeacherUnavailable(_) => "teacherUnavailable",
            Self::ClashAccepted(_) => "clashAccepted",
            Self::ClashRefused(_) => "clashRefused",
            Self::RequestUserList => "requestUserList",
            Self::Unbekannt => "unbekannt",
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Server -> Client)
// ---------------------------------------------------------------------------

/// Begruessung nach dem Verbindungsaufbau
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verbunden {
    pub client_id: ClientId,
    pub message: String,
}

/// Ein positionierter Benutzer im Presence-Snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenutzerEintrag {
    pub id: ClientId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Unix-Timestamp in Millisekunden
    pub last_update_time: i64,
}

/// Vollstaendiger Presence-Snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenutzerListe {
    pub users: Vec<BenutzerEintrag>,
    pub count: usize,
}

/// Bestaetigung des Einreihens in eine Warteschlange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SucheLaeuft {
    pub message: String,
    pub queue_position: usize,
    pub queue_key: String,
}

/// Positions-Update innerhalb einer Warteschlange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarteschlangenStatus {
    pub queue_position: usize,
    pub queue_size: usize,
    pub message: String,
}

/// Identitaet des Gegenuebers in einem Match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub name: String,
    pub prenom: Option<String>,
    pub nom: Option<String>,
    pub classe: Option<String>,
    pub email: Option<String>,
    /// Nur bei Lehrer/Schueler-Matches gesetzt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_teacher: Option<bool>,
}

/// Match-Benachrichtigung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchGefunden {
    pub meet_link: String,
    pub meet_id: String,
    /// Nur bei Peer-Matches gesetzt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
    pub partner: Partner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matiere: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niveau: Option<String>,
}

/// Bestaetigung einer Lehrer-Verfuegbarkeitsaenderung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FachBestaetigung {
    pub matiere: String,
    pub message: String,
}

/// Beide Seiten haben den Clash angenommen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClashBestaetigt {
    pub meet_link: String,
    pub meet_id: String,
    pub debate_question: Option<String>,
}

/// Reine Text-Nachricht (Fehler, Abbruch, Ablehnung)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hinweis {
    pub message: String,
}

/// Alle Nachrichten die der Server senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerNachricht {
    Connected(Verbunden),
    UserList(BenutzerListe),
    Searching(SucheLaeuft),
    QueueUpdate(WarteschlangenStatus),
    MatchFound(MatchGefunden),
    TeacherAvailableConfirmed(FachBestaetigung),
    TeacherUnavailableConfirmed(FachBestaetigung),
    ClashBothAccepted(ClashBestaetigt),
    ClashPartnerRefused(Hinweis),
    SearchStopped(Hinweis),
    Error(Hinweis),
}

impl ServerNachricht {
    /// Erstellt eine Fehler-Nachricht
    pub fn fehler(message: impl Into<String>) -> Self {
        Self::Error(Hinweis {
            message: message.into(),
        })
    }

    /// Erstellt die Begruessung fuer eine neue Verbindung
    pub fn verbunden(client_id: ClientId) -> Self {
        Self::Connected(Verbunden {
            client_id,
            message: "Connexion établie".to_string(),
        })
    }

    /// Erstellt einen Presence-Snapshot
    pub fn benutzer_liste(users: Vec<BenutzerEintrag>) -> Self {
        let count = users.len();
        Self::UserList(BenutzerListe { users, count })
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Name des Nachrichtentyps fuer Logs
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::UserList(_) => "userList",
            Self::Searching(_) => "searching",
            Self::QueueUpdate(_) => "queueUpdate",
            Self::MatchFound(_) => "matchFound",
            Self::TeacherAvailableConfirmed(_) => "teacherAvailableConfirmed",
            Self::TeacherUnavailableConfirmed(_) => "teacherUnavailableConfirmed",
            Self::ClashBothAccepted(_) => "clashBothAccepted",
            Self::ClashPartnerRefused(_) => "clashPartnerRefused",
            Self::SearchStopped(_) => "searchStopped",
            Self::Error(_) => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
