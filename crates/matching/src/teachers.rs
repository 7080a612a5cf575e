//! Lehrer-Verzeichnis – Verfuegbare Lehrer und wartende Schueler je Fach
//!
//! Beide Seiten sind FIFO. Ein Lehrer steht pro Fach hoechstens einmal in
//! der Liste, ebenso ein Schueler in der Warteschlange `cours:<fach>`.

use lokin_core::types::ClientId;
use std::collections::{HashMap, VecDeque};

use crate::queues::{anhaengen, ersten_entnehmen, Pruefung};

/// Lehrer- und Schueler-Listen je Fach
#[derive(Debug, Default)]
pub struct TeacherDirectory {
    lehrer: HashMap<String, VecDeque<ClientId>>,
    schueler: HashMap<String, VecDeque<ClientId>>,
}

/// Entfernt `id` aus allen Listen, leere Listen fallen weg
fn aus_allen_entfernen(listen: &mut HashMap<String, VecDeque<ClientId>>, id: &ClientId) -> usize {
    let mut entfernt = 0;
    listen.retain(|_, liste| {
        let vorher = liste.len();
        liste.retain(|x| x != id);
        entfernt += vorher - liste.len();
        !liste.is_empty()
    });
    entfernt
}

/// Entnimmt aus der Liste eines Fachs und verwirft sie, wenn sie leer wird
fn entnehmen(
    listen: &mut HashMap<String, VecDeque<ClientId>>,
    fach: &str,
    pruefen: impl FnMut(ClientId) -> Pruefung,
) -> Option<ClientId> {
    let liste = listen.get_mut(fach)?;
    let treffer = ersten_entnehmen(liste, pruefen);
    if liste.is_empty() {
        listen.remove(fach);
    }
    treffer
}

impl TeacherDirectory {
    pub fn neu() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Lehrer
    // -----------------------------------------------------------------------

    /// Traegt einen Lehrer ein. `false` wenn er schon gelistet war.
    pub fn lehrer_hinzufuegen(&mut self, fach: &str, id: ClientId) -> bool {
        let liste = self.lehrer.entry(fach.to_string()).or_default();
        let vorher = liste.len();
        anhaengen(liste, id);
        liste.len() != vorher
    }

    /// Stellt einen entnommenen Lehrer wieder an die Spitze
    pub fn lehrer_zuruecklegen(&mut self, fach: &str, id: ClientId) {
        let liste = self.lehrer.entry(fach.to_string()).or_default();
        if !liste.contains(&id) {
            liste.push_front(id);
        }
    }

    /// Entfernt einen Lehrer aus einem Fach. `true` wenn er gelistet war.
    pub fn lehrer_entfernen(&mut self, fach: &str, id: &ClientId) -> bool {
        let Some(liste) = self.lehrer.get_mut(fach) else {
            return false;
        };
        let vorher = liste.len();
        liste.retain(|x| x != id);
        let entfernt = liste.len() != vorher;
        if liste.is_empty() {
            self.lehrer.remove(fach);
        }
        entfernt
    }

    /// Entfernt einen Lehrer aus allen Faechern
    pub fn lehrer_ueberall_entfernen(&mut self, id: &ClientId) -> usize {
        aus_allen_entfernen(&mut self.lehrer, id)
    }

    /// Entnimmt den aeltesten passenden Lehrer eines Fachs
    pub fn lehrer_nehmen(
        &mut self,
        fach: &str,
        pruefen: impl FnMut(ClientId) -> Pruefung,
    ) -> Option<ClientId> {
        entnehmen(&mut self.lehrer, fach, pruefen)
    }

    /// Lehrer eines Fachs in FIFO-Reihenfolge
    pub fn lehrer_von(&self, fach: &str) -> Vec<ClientId> {
        self.lehrer
            .get(fach)
            .map(|l| l.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ist der Lehrer noch fuer irgendein Fach gelistet?
    pub fn ist_gelistet(&self, id: &ClientId) -> bool {
        self.lehrer.values().any(|l| l.contains(id))
    }

    // -----------------------------------------------------------------------
    // Wartende Schueler
    // -----------------------------------------------------------------------

    /// Reiht einen Schueler ein und gibt seine 1-basierte Position zurueck
    pub fn schueler_einreihen(&mut self, fach: &str, id: ClientId) -> usize {
        anhaengen(self.schueler.entry(fach.to_string()).or_default(), id)
    }

    /// Entnimmt den aeltesten passenden Schueler eines Fachs
    pub fn schueler_nehmen(
        &mut self,
        fach: &str,
        pruefen: impl FnMut(ClientId) -> Pruefung,
    ) -> Option<ClientId> {
        entnehmen(&mut self.schueler, fach, pruefen)
    }

    /// Entfernt einen Schueler aus allen Warteschlangen
    pub fn schueler_ueberall_entfernen(&mut self, id: &ClientId) -> usize {
        aus_allen_entfernen(&mut self.schueler, id)
    }

    /// Wartende Schueler eines Fachs in FIFO-Reihenfolge
    pub fn schueler_von(&self, fach: &str) -> Vec<ClientId> {
        self.schueler
            .get(fach)
            .map(|l| l.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Anzahl wartender Schueler ueber alle Faecher
    pub fn wartende(&self) -> usize {
        self.schueler.values().map(VecDeque::len).sum()
    }

    /// Kommt die ID irgendwo im Verzeichnis vor?
    pub fn enthaelt(&self, id: &ClientId) -> bool {
        self.ist_gelistet(id) || self.schueler.values().any(|l| l.contains(id))
    }
}
