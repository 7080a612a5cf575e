//! Fehlertypen fuer den Matching-Service
//!
//! Die `Display`-Ausgabe ist der Text, den der Client im `error`-Frame sieht.

use thiserror::Error;

/// Fehlertyp fuer den Matching-Service
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchingError {
    /// `searchType` fehlt oder keine Sprache angegeben
    #[error("Paramètres de recherche manquants")]
    SuchparameterFehlen,

    /// Lehrer-Nachricht ohne `matiere`
    #[error("Matière manquante")]
    MatiereFehlt,

    /// Kurs-Suche ohne `matiere`
    #[error("Matière non spécifiée")]
    MatiereNichtAngegeben,

    /// Clash-Sitzung existiert nicht (oder `matchId` fehlt)
    #[error("Match non trouvé")]
    MatchNichtGefunden,

    /// Absender ist kein Teilnehmer der Clash-Sitzung
    #[error("Utilisateur non impliqué dans ce match")]
    NichtBeteiligt,

    /// Ablehnung einer bereits bestaetigten Sitzung
    #[error("Clash déjà confirmé")]
    ClashBereitsBestaetigt,

    /// lat/lng fehlen oder liegen ausserhalb des gueltigen Bereichs
    #[error("Latitude et longitude invalides")]
    UngueltigePosition,

    /// JSON nicht lesbar oder Feldtypen falsch
    #[error("Message invalide : {0}")]
    UngueltigeNachricht(String),

    /// Verbindung ist nicht (mehr) registriert
    #[error("Utilisateur non trouvé")]
    UnbekannteVerbindung,
}

impl MatchingError {
    /// Erstellt einen Fehler fuer eine nicht lesbare Nachricht
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeNachricht(msg.into())
    }
}

/// Result-Typ fuer den Matching-Service
pub type MatchingResult<T> = Result<T, MatchingError>;
