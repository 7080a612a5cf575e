//! Peer-Matching-Warteschlangen
//!
//! FIFO-Listen je Schluessel `(activity, sprache)`. Eine Suche mit mehreren
//! Sprachen steht unter mehreren Schluesseln und wird bei Match, Stop oder
//! Trennen aus **allen** entfernt. Leere Listen werden sofort verworfen.

use lokin_core::types::ClientId;
use lokin_protocol::SuchTyp;
use std::collections::{HashMap, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// QueueKey
// ---------------------------------------------------------------------------

/// Schluessel einer Warteschlange, Wire-Form `<activity>:<wert>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey {
    pub typ: SuchTyp,
    /// Sprache bei Peer-Suchen, Fach bei `cours`
    pub wert: String,
}

impl QueueKey {
    pub fn neu(typ: SuchTyp, wert: impl Into<String>) -> Self {
        Self {
            typ,
            wert: wert.into(),
        }
    }

    /// Warteschlange der Schueler fuer ein Fach (`cours:<fach>`)
    pub fn kurs(fach: impl Into<String>) -> Self {
        Self::neu(SuchTyp::Cours, fach)
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.typ, self.wert)
    }
}

// ---------------------------------------------------------------------------
// Scan mit Bereinigung
// ---------------------------------------------------------------------------

/// Urteil ueber einen Kandidaten beim Durchlaufen einer Liste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pruefung {
    /// Kandidat nehmen
    Passend,
    /// Kandidat bleibt stehen, weitersuchen
    Ueberspringen,
    /// Veralteter Eintrag, aus der Liste streichen
    Entfernen,
}

/// Durchlaeuft eine FIFO-Liste von vorne, streicht veraltete Eintraege und
/// entnimmt den ersten passenden.
pub(crate) fn ersten_entnehmen(
    liste: &mut VecDeque<ClientId>,
    mut pruefen: impl FnMut(ClientId) -> Pruefung,
) -> Option<ClientId> {
    let mut i = 0;
    while i < liste.len() {
        let kandidat = liste[i];
        match pruefen(kandidat) {
            Pruefung::Passend => return liste.remove(i),
            Pruefung::Ueberspringen => i += 1,
            Pruefung::Entfernen => {
                liste.remove(i);
            }
        }
    }
    None
}

/// Haengt an, falls noch nicht enthalten. Gibt die 1-basierte Position zurueck.
pub(crate) fn anhaengen(liste: &mut VecDeque<ClientId>, id: ClientId) -> usize {
    if let Some(pos) = liste.iter().position(|x| *x == id) {
        return pos + 1;
    }
    liste.push_back(id);
    liste.len()
}

// ---------------------------------------------------------------------------
// PeerQueues
// ---------------------------------------------------------------------------

/// Alle Peer-Warteschlangen
#[derive(Debug, Default)]
pub struct PeerQueues {
    listen: HashMap<QueueKey, VecDeque<ClientId>>,
}

impl PeerQueues {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Reiht ein (hoechstens einmal pro Schluessel) und gibt die Position zurueck
    pub fn einreihen(&mut self, key: &QueueKey, id: ClientId) -> usize {
        anhaengen(self.listen.entry(key.clone()).or_default(), id)
    }

    /// Entnimmt den ersten passenden Kandidaten, streicht veraltete Eintraege
    pub fn ersten_passenden(
        &mut self,
        key: &QueueKey,
        pruefen: impl FnMut(ClientId) -> Pruefung,
    ) -> Option<ClientId> {
        let liste = self.listen.get_mut(key)?;
        let treffer = ersten_entnehmen(liste, pruefen);
        if liste.is_empty() {
            self.listen.remove(key);
        }
        treffer
    }

    /// Entfernt eine Verbindung aus allen Warteschlangen
    ///
    /// Gibt die betroffenen Schluessel zurueck (sortiert).
    pub fn ueberall_entfernen(&mut self, id: &ClientId) -> Vec<QueueKey> {
        let mut betroffen = Vec::new();
        self.listen.retain(|key, liste| {
            let vorher = liste.len();
            liste.retain(|x| x != id);
            if liste.len() != vorher {
                betroffen.push(key.clone());
            }
            !liste.is_empty()
        });
        betroffen.sort();
        betroffen
    }

    /// Mitglieder einer Warteschlange in FIFO-Reihenfolge
    pub fn mitglieder(&self, key: &QueueKey) -> Vec<ClientId> {
        self.listen
            .get(key)
            .map(|l| l.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 1-basierte Position oder `None`
    pub fn position(&self, key: &QueueKey, id: &ClientId) -> Option<usize> {
        self.listen
            .get(key)?
            .iter()
            .position(|x| x == id)
            .map(|p| p + 1)
    }

    pub fn laenge(&self, key: &QueueKey) -> usize {
        self.listen.get(key).map(VecDeque::len).unwrap_or(0)
    }

    /// Summe aller Eintraege ueber alle Schluessel
    pub fn eintraege(&self) -> usize {
        self.listen.values().map(VecDeque::len).sum()
    }

    /// Ist die Verbindung in irgendeiner Warteschlange?
    pub fn enthaelt(&self, id: &ClientId) -> bool {
        self.listen.values().any(|l| l.contains(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
