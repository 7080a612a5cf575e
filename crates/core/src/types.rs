//! Gemeinsame Identifikationstypen fuer LOK IN
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Verbindungs- und Match-IDs zur Compilezeit auszuschliessen.
//! Auf dem Draht erscheinen sie als nackte UUID-Strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID (eine pro WebSocket, gueltig fuer die Prozesslaufzeit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Erstellt eine neue zufaellige ClientId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Letzte vier Zeichen der ID, z.B. fuer Platzhalter-Namen
    pub fn kurz(&self) -> String {
        let s = self.0.simple().to_string();
        s[s.len() - 4..].to_string()
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

/// Eindeutige Match-ID (identifiziert eine Clash-Sitzung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    /// Erstellt eine neue zufaellige MatchId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "match:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_eindeutig() {
        let a = ClientId::new();
        let b = ClientId::new();
        assert_ne!(a, b, "Zwei neue ClientIds muessen verschieden sein");
    }

    #[test]
    fn client_id_kurzform() {
        let id = ClientId(Uuid::nil());
        assert_eq!(id.kurz(), "0000");
        assert_eq!(ClientId::new().kurz().len(), 4);
    }

    #[test]
    fn match_id_display() {
        let id = MatchId(Uuid::nil());
        assert!(id.to_string().starts_with("match:"));
    }

    #[test]
    fn ids_als_nackter_string_serialisiert() {
        let id = ClientId(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");

        let mid: MatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(mid.inner(), Uuid::nil());
    }
}
