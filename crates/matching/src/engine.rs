//! Matching-Engine – Besitzt den gesamten Vermittlungszustand
//!
//! Die Engine ist synchron und gehoert genau einem Task (`MatchingService`).
//! Jeder Handler laeuft bis zum Ende, bevor der naechste Befehl oder der
//! Reaper-Tick verarbeitet wird.
//!
//! ## Teardown
//! `trennen` ist der einzige Weg, eine Verbindung zu entfernen. Sowohl das
//! regulaere Schliessen des Sockets als auch der Reaper laufen hier durch:
//! Warteschlangen, Lehrer-Verzeichnis, Clash-Sitzungen, Registry, Snapshot.

use lokin_core::types::{ClientId, MatchId};
use lokin_observability::LokinMetrics;
use lokin_protocol::control::{
    ClashAblehnung, ClashAnnahme, ClashBestaetigt, FachBestaetigung, Hinweis,
    LehrerNichtVerfuegbar, LehrerVerfuegbar, MatchGefunden, PositionUpdate, SucheLaeuft,
    SucheStarten, WarteschlangenStatus,
};
use lokin_protocol::{ServerNachricht, SuchTyp};
use std::time::{Duration, Instant};

use crate::broadcast::ClientSender;
use crate::clash::{Annahme, ClashCoordinator};
use crate::error::{MatchingError, MatchingResult};
use crate::meet::{MeetGenerator, STANDARD_MEET_BASIS_URL};
use crate::presence;
use crate::queues::{PeerQueues, Pruefung, QueueKey};
use crate::registry::{nicht_leer, ConnectionRegistry, Suche};
use crate::teachers::TeacherDirectory;

const TEXT_SUCHE_LAEUFT: &str = "Recherche en cours...";
const TEXT_LEHRER_SUCHE: &str = "Recherche d'un professeur disponible...";
const TEXT_SUCHE_GESTOPPT: &str = "Recherche arrêtée";
const TEXT_PARTNER_ABGELEHNT: &str = "Votre partenaire a refusé le Clash";
const TEXT_CLASH_ABGELAUFEN: &str = "Le Clash a expiré sans réponse";

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Laufzeitparameter der Engine
#[derive(Debug, Clone)]
pub struct EngineKonfig {
    /// Stille, nach der der Reaper eine Verbindung trennt
    pub leerlauf_timeout: Duration,
    /// Wie lange eine bestaetigte Clash-Sitzung erhalten bleibt
    pub clash_gnadenfrist: Duration,
    /// Abbruch offener Clash-Sitzungen (None = nie)
    pub clash_timeout: Option<Duration>,
    pub meet_basis_url: String,
}

impl Default for EngineKonfig {
    fn default() -> Self {
        Self {
            leerlauf_timeout: Duration::from_secs(300),
            clash_gnadenfrist: Duration::from_secs(60),
            clash_timeout: None,
            meet_basis_url: STANDARD_MEET_BASIS_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Kandidaten-Pruefung
// ---------------------------------------------------------------------------

fn peer_pruefen(
    registry: &ConnectionRegistry,
    suchender: ClientId,
    suche: &Suche,
    kandidat: ClientId,
) -> Pruefung {
    if kandidat == suchender {
        return Pruefung::Ueberspringen;
    }
    match registry.get(&kandidat) {
        Some(c) if c.ist_lebendig() && c.sucht => match &c.suche {
            Some(s) if s.passt_zu(suche) => Pruefung::Passend,
            _ => Pruefung::Entfernen,
        },
        _ => Pruefung::Entfernen,
    }
}

fn lehrer_pruefen(registry: &ConnectionRegistry, schueler: ClientId, lehrer: ClientId) -> Pruefung {
    if lehrer == schueler {
        return Pruefung::Ueberspringen;
    }
    match registry.get(&lehrer) {
        Some(c) if c.ist_lebendig() && c.ist_lehrer => Pruefung::Passend,
        _ => Pruefung::Entfernen,
    }
}

fn schueler_pruefen(
    registry: &ConnectionRegistry,
    lehrer: ClientId,
    fach: &str,
    schueler: ClientId,
) -> Pruefung {
    if schueler == lehrer {
        return Pruefung::Ueberspringen;
    }
    let wartet = registry.get(&schueler).is_some_and(|c| {
        c.ist_lebendig()
            && c.sucht
            && c.suche
                .as_ref()
                .is_some_and(|s| s.typ == SuchTyp::Cours && s.matiere.as_deref() == Some(fach))
    });
    if wartet {
        Pruefung::Passend
    } else {
        Pruefung::Entfernen
    }
}

// ---------------------------------------------------------------------------
// MatchingEngine
// ---------------------------------------------------------------------------

/// Zentrale Vermittlungslogik
pub struct MatchingEngine {
    konfig: EngineKonfig,
    registry: ConnectionRegistry,
    queues: PeerQueues,
    lehrer: TeacherDirectory,
    clash: ClashCoordinator,
    meet: MeetGenerator,
    metriken: LokinMetrics,
}

impl MatchingEngine {
    /// Erstellt eine leere Engine
    pub fn neu(konfig: EngineKonfig, metriken: LokinMetrics) -> Self {
        Self {
            meet: MeetGenerator::neu(konfig.meet_basis_url.clone()),
            konfig,
            registry: ConnectionRegistry::neu(),
            queues: PeerQueues::neu(),
            lehrer: TeacherDirectory::neu(),
            clash: ClashCoordinator::neu(),
            metriken,
        }
    }

    pub fn konfig(&self) -> &EngineKonfig {
        &self.konfig
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn queues(&self) -> &PeerQueues {
        &self.queues
    }

    pub fn lehrer(&self) -> &TeacherDirectory {
        &self.lehrer
    }

    pub fn clash(&self) -> &ClashCoordinator {
        &self.clash
    }

    // -----------------------------------------------------------------------
    // Verbindungen
    // -----------------------------------------------------------------------

    /// Registriert eine neue Verbindung und sendet `connected`
    pub fn verbinden(&mut self, sender: ClientSender, jetzt: Instant) -> ClientId {
        let id = self.registry.registrieren(sender, jetzt);
        self.registry.senden(&id, ServerNachricht::verbunden(id));
        self.metriken
            .connected_clients
            .set(self.registry.anzahl() as i64);
        tracing::info!(client_id = %id, online = self.registry.anzahl(), "Client verbunden");
        id
    }

    /// Meldet eingehende Aktivitaet. `false` wenn die Verbindung unbekannt ist.
    pub fn aktivitaet_melden(&mut self, id: &ClientId, jetzt: Instant) -> bool {
        self.registry.aktivitaet_melden(id, jetzt)
    }

    /// Sendet einen Fehler-Frame an die Verbindung
    pub fn fehler_senden(&self, id: &ClientId, fehler: &MatchingError) {
        self.registry
            .senden(id, ServerNachricht::fehler(fehler.to_string()));
    }

    /// Entfernt eine Verbindung samt aller Verweise
    ///
    /// Idempotent: `false` wenn die Verbindung schon weg war.
    pub fn trennen(&mut self, id: &ClientId) -> bool {
        if !self.registry.enthaelt(id) {
            return false;
        }

        let betroffen = self.queues.ueberall_entfernen(id);
        self.lehrer.schueler_ueberall_entfernen(id);
        self.lehrer.lehrer_ueberall_entfernen(id);

        // Offene Clash-Sitzungen gelten als abgelehnt
        for match_id in self.clash.offene_von(id) {
            if let Ok(partner) = self.clash.ablehnen(&match_id, id) {
                self.partner_abgelehnt_melden(&partner);
            }
        }
        self.clash.bestaetigte_entfernen_von(id);

        let name = self
            .registry
            .entfernen(id)
            .map(|c| c.anzeigename())
            .unwrap_or_default();

        self.warteschlangen_status_senden(&betroffen);
        self.warteschlangen_metrik();
        self.metriken
            .connected_clients
            .set(self.registry.anzahl() as i64);

        presence::an_alle_verteilen(&self.registry);

        tracing::info!(
            client_id = %id,
            name = %name,
            online = self.registry.anzahl(),
            "Client getrennt"
        );
        true
    }

    /// Reaper-Durchlauf: inaktive Verbindungen und abgelaufene Clash-Sitzungen
    ///
    /// Gibt die Anzahl der getrennten Verbindungen zurueck.
    pub fn leerlauf_pruefen(&mut self, jetzt: Instant) -> usize {
        let inaktiv = self
            .registry
            .inaktive(jetzt, self.konfig.leerlauf_timeout);

        for id in &inaktiv {
            if let Some(c) = self.registry.get(id) {
                c.sender.schliessen();
            }
            tracing::info!(client_id = %id, "Verbindung wegen Inaktivitaet getrennt");
            if self.trennen(id) {
                self.metriken.idle_evictions_total.inc();
            }
        }

        let geloescht = self
            .clash
            .abgelaufene_entfernen(jetzt, self.konfig.clash_gnadenfrist);
        if geloescht > 0 {
            tracing::debug!(anzahl = geloescht, "Bestaetigte Clash-Sitzungen aufgeraeumt");
        }

        if let Some(timeout) = self.konfig.clash_timeout {
            for sitzung in self.clash.zeitueberschreitungen(jetzt, timeout) {
                for teilnehmer in sitzung.teilnehmer {
                    self.registry.senden(
                        &teilnehmer,
                        ServerNachricht::ClashPartnerRefused(Hinweis {
                            message: TEXT_CLASH_ABGELAUFEN.to_string(),
                        }),
                    );
                    self.clash_suche_beenden(&teilnehmer);
                }
                self.metriken.clash_ausgang_zaehlen("abgelaufen");
                tracing::info!(match_id = %sitzung.match_id, "Clash-Sitzung abgelaufen");
            }
        }

        inaktiv.len()
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// `updatePosition` – Position und Identitaet setzen, Snapshot verteilen
    pub fn position_aktualisieren(
        &mut self,
        id: &ClientId,
        update: &PositionUpdate,
    ) -> MatchingResult<()> {
        let (lat, lng) = match (update.lat, update.lng) {
            (Some(lat), Some(lng)) if presence::position_gueltig(lat, lng) => (lat, lng),
            _ => return Err(MatchingError::UngueltigePosition),
        };

        let c = self
            .registry
            .get_mut(id)
            .ok_or(MatchingError::UnbekannteVerbindung)?;
        c.position = Some((lat, lng));
        c.identitaet.name_setzen(update.name.as_ref());
        c.identitaet.felder_setzen(
            update.email.as_ref(),
            update.prenom.as_ref(),
            update.nom.as_ref(),
            update.classe.as_ref(),
        );
        c.letztes_positions_update = Some(chrono::Utc::now().timestamp_millis());

        tracing::debug!(client_id = %id, lat, lng, "Position aktualisiert");
        presence::an_alle_verteilen(&self.registry);
        Ok(())
    }

    /// `requestUserList` – Snapshot nur an den Anfragenden
    pub fn benutzerliste_senden(&self, id: &ClientId) {
        presence::an_einen_senden(&self.registry, id);
    }

    // -----------------------------------------------------------------------
    // Suche
    // -----------------------------------------------------------------------

    /// `startSearch` – Peer-Suche oder Lehrer-Suche (`cours`)
    pub fn suche_starten(
        &mut self,
        id: &ClientId,
        anfrage: &SucheStarten,
        jetzt: Instant,
    ) -> MatchingResult<()> {
        if !self.registry.enthaelt(id) {
            return Err(MatchingError::UnbekannteVerbindung);
        }

        let typ = anfrage
            .search_type
            .ok_or(MatchingError::SuchparameterFehlen)?;
        let suche = if typ == SuchTyp::Cours {
            let fach = nicht_leer(anfrage.matiere.as_ref())
                .ok_or(MatchingError::MatiereNichtAngegeben)?;
            Suche {
                typ,
                sprachen: Vec::new(),
                matiere: Some(fach),
                niveau: nicht_leer(anfrage.niveau.as_ref()),
            }
        } else {
            let sprachen = anfrage.sprachen();
            if sprachen.is_empty() {
                return Err(MatchingError::SuchparameterFehlen);
            }
            Suche {
                typ,
                sprachen,
                matiere: nicht_leer(anfrage.matiere.as_ref()),
                niveau: nicht_leer(anfrage.niveau.as_ref()),
            }
        };

        // Eine neue Suche ersetzt die alte
        self.suche_verlassen(id);

        if let Some(c) = self.registry.get_mut(id) {
            c.identitaet.uebernehmen(
                anfrage.email.as_ref(),
                anfrage.prenom.as_ref(),
                anfrage.nom.as_ref(),
                anfrage.classe.as_ref(),
            );
            c.sucht = true;
            c.suche = Some(suche.clone());
        }

        tracing::info!(
            client_id = %id,
            typ = %suche.typ,
            sprachen = ?suche.sprachen,
            matiere = ?suche.matiere,
            "Suche gestartet"
        );

        if typ == SuchTyp::Cours {
            self.schueler_suche(*id, &suche);
        } else {
            self.peer_suche(*id, &suche, jetzt);
        }
        self.warteschlangen_metrik();
        Ok(())
    }

    /// `stopSearch` – idempotent, ohne Antwort wenn nicht gesucht wird
    pub fn suche_stoppen(&mut self, id: &ClientId) -> MatchingResult<()> {
        let sucht = self.registry.get(id).is_some_and(|c| c.sucht);
        if !sucht {
            return Ok(());
        }

        self.suche_verlassen(id);
        if let Some(c) = self.registry.get_mut(id) {
            c.suche_beenden();
        }
        self.registry.senden(
            id,
            ServerNachricht::SearchStopped(Hinweis {
                message: TEXT_SUCHE_GESTOPPT.to_string(),
            }),
        );
        self.warteschlangen_metrik();
        tracing::info!(client_id = %id, "Suche gestoppt");
        Ok(())
    }

    /// Entfernt die Verbindung aus allen Such-Warteschlangen
    fn suche_verlassen(&mut self, id: &ClientId) {
        let betroffen = self.queues.ueberall_entfernen(id);
        self.lehrer.schueler_ueberall_entfernen(id);
        self.warteschlangen_status_senden(&betroffen);
    }

    fn peer_suche(&mut self, id: ClientId, suche: &Suche, jetzt: Instant) {
        let mut durchsucht = Vec::new();
        let mut partner = None;

        for sprache in &suche.sprachen {
            let key = QueueKey::neu(suche.typ, sprache.clone());
            let registry = &self.registry;
            let treffer = self
                .queues
                .ersten_passenden(&key, |k| peer_pruefen(registry, id, suche, k));
            durchsucht.push(key);
            if treffer.is_some() {
                partner = treffer;
                break;
            }
        }

        match partner {
            Some(partner) => {
                let mut betroffen = self.queues.ueberall_entfernen(&partner);
                betroffen.extend(durchsucht);
                betroffen.sort();
                betroffen.dedup();

                self.peer_match_erstellen(id, partner, suche.typ, jetzt);
                self.warteschlangen_status_senden(&betroffen);
            }
            None => {
                let mut eingereiht = Vec::with_capacity(suche.sprachen.len());
                for sprache in &suche.sprachen {
                    let key = QueueKey::neu(suche.typ, sprache.clone());
                    let position = self.queues.einreihen(&key, id);
                    self.registry.senden(
                        &id,
                        ServerNachricht::Searching(SucheLaeuft {
                            message: TEXT_SUCHE_LAEUFT.to_string(),
                            queue_position: position,
                            queue_key: key.to_string(),
                        }),
                    );
                    eingereiht.push(key);
                }
                // Auch durch den Scan bereinigte Listen bekommen ein Update
                eingereiht.extend(durchsucht);
                eingereiht.sort();
                eingereiht.dedup();
                self.warteschlangen_status_senden(&eingereiht);
            }
        }
    }

    fn peer_match_erstellen(&mut self, a: ClientId, b: ClientId, typ: SuchTyp, jetzt: Instant) {
        let (Some(ca), Some(cb)) = (self.registry.get(&a), self.registry.get(&b)) else {
            return;
        };
        let fuer_a = cb.als_partner(None);
        let fuer_b = ca.als_partner(None);
        let namen = (ca.anzeigename(), cb.anzeigename());

        let raum = self.meet.neuer_raum();
        let match_id = MatchId::new();

        if typ.ist_clash() {
            // Beide bleiben suchend, bis der Clash bestaetigt oder abgelehnt ist
            self.clash.erstellen(match_id, a, b, raum.clone(), jetzt);
        } else {
            for id in [a, b] {
                if let Some(c) = self.registry.get_mut(&id) {
                    c.suche_beenden();
                }
            }
        }

        for (empfaenger, partner) in [(a, fuer_a), (b, fuer_b)] {
            self.registry.senden(
                &empfaenger,
                ServerNachricht::MatchFound(MatchGefunden {
                    meet_link: raum.link.clone(),
                    meet_id: raum.id.clone(),
                    match_id: Some(match_id),
                    partner,
                    matiere: None,
                    niveau: None,
                }),
            );
        }

        self.metriken.match_zaehlen(typ.als_str());
        tracing::info!(
            match_id = %match_id,
            typ = %typ,
            a = %namen.0,
            b = %namen.1,
            meet_id = %raum.id,
            "Match gefunden"
        );
    }

    // -----------------------------------------------------------------------
    // Lehrer / Schueler
    // -----------------------------------------------------------------------

    fn schueler_suche(&mut self, schueler: ClientId, suche: &Suche) {
        let Some(fach) = suche.matiere.as_deref() else {
            return;
        };

        let registry = &self.registry;
        let lehrer = self
            .lehrer
            .lehrer_nehmen(fach, |t| lehrer_pruefen(registry, schueler, t));

        match lehrer {
            Some(lehrer) => self.lehrstunde_erstellen(lehrer, schueler, fach),
            None => {
                let position = self.lehrer.schueler_einreihen(fach, schueler);
                self.registry.senden(
                    &schueler,
                    ServerNachricht::Searching(SucheLaeuft {
                        message: TEXT_LEHRER_SUCHE.to_string(),
                        queue_position: position,
                        queue_key: QueueKey::kurs(fach).to_string(),
                    }),
                );
                tracing::debug!(client_id = %schueler, fach, position, "Schueler wartet auf Lehrer");
            }
        }
    }

    fn lehrstunde_erstellen(&mut self, lehrer: ClientId, schueler: ClientId, fach: &str) {
        let (Some(cl), Some(cs)) = (self.registry.get(&lehrer), self.registry.get(&schueler))
        else {
            return;
        };
        let niveau = cs.suche.as_ref().and_then(|s| s.niveau.clone());
        let fuer_schueler = cl.als_partner(Some(true));
        let fuer_lehrer = cs.als_partner(Some(false));

        let raum = self.meet.neuer_raum();
        for (empfaenger, partner) in [(schueler, fuer_schueler), (lehrer, fuer_lehrer)] {
            self.registry.senden(
                &empfaenger,
                ServerNachricht::MatchFound(MatchGefunden {
                    meet_link: raum.link.clone(),
                    meet_id: raum.id.clone(),
                    match_id: None,
                    partner,
                    matiere: Some(fach.to_string()),
                    niveau: niveau.clone(),
                }),
            );
        }

        if let Some(c) = self.registry.get_mut(&schueler) {
            c.suche_beenden();
        }
        self.lehrer.schueler_ueberall_entfernen(&schueler);

        self.metriken.match_zaehlen(SuchTyp::Cours.als_str());
        tracing::info!(
            lehrer = %lehrer,
            schueler = %schueler,
            fach,
            meet_id = %raum.id,
            "Lehrer-Match gefunden"
        );
    }

    /// `teacherAvailable` – Lehrer eintragen und wartende Schueler bedienen
    pub fn lehrer_verfuegbar(
        &mut self,
        id: &ClientId,
        anfrage: &LehrerVerfuegbar,
    ) -> MatchingResult<()> {
        let fach = nicht_leer(anfrage.matiere.as_ref()).ok_or(MatchingError::MatiereFehlt)?;
        let c = self
            .registry
            .get_mut(id)
            .ok_or(MatchingError::UnbekannteVerbindung)?;
        c.ist_lehrer = true;
        c.identitaet.uebernehmen(
            anfrage.email.as_ref(),
            anfrage.prenom.as_ref(),
            anfrage.nom.as_ref(),
            None,
        );

        let neu = self.lehrer.lehrer_hinzufuegen(&fach, *id);
        self.registry.senden(
            id,
            ServerNachricht::TeacherAvailableConfirmed(FachBestaetigung {
                message: format!("Vous êtes maintenant disponible pour {fach}"),
                matiere: fach.clone(),
            }),
        );
        tracing::info!(
            client_id = %id,
            fach = %fach,
            neu,
            lehrer = self.lehrer.lehrer_von(&fach).len(),
            "Lehrer verfuegbar"
        );

        self.wartende_schueler_bedienen(&fach);
        self.warteschlangen_metrik();
        Ok(())
    }

    /// Paart wartende Schueler (aelteste zuerst) mit verfuegbaren Lehrern
    fn wartende_schueler_bedienen(&mut self, fach: &str) {
        loop {
            let registry = &self.registry;
            let Some(lehrer) = self.lehrer.lehrer_nehmen(fach, |t| {
                match registry.get(&t) {
                    Some(c) if c.ist_lebendig() && c.ist_lehrer => Pruefung::Passend,
                    _ => Pruefung::Entfernen,
                }
            }) else {
                break;
            };

            let registry = &self.registry;
            let Some(schueler) = self
                .lehrer
                .schueler_nehmen(fach, |s| schueler_pruefen(registry, lehrer, fach, s))
            else {
                self.lehrer.lehrer_zuruecklegen(fach, lehrer);
                break;
            };

            self.lehrstunde_erstellen(lehrer, schueler, fach);
        }
    }

    /// `teacherUnavailable` – nur aus diesem Fach austragen
    pub fn lehrer_nicht_verfuegbar(
        &mut self,
        id: &ClientId,
        anfrage: &LehrerNichtVerfuegbar,
    ) -> MatchingResult<()> {
        let fach = nicht_leer(anfrage.matiere.as_ref()).ok_or(MatchingError::MatiereFehlt)?;
        if !self.registry.enthaelt(id) {
            return Err(MatchingError::UnbekannteVerbindung);
        }

        if self.lehrer.lehrer_entfernen(&fach, id) {
            let noch_gelistet = self.lehrer.ist_gelistet(id);
            if let Some(c) = self.registry.get_mut(id) {
                c.ist_lehrer = noch_gelistet;
            }
            self.registry.senden(
                id,
                ServerNachricht::TeacherUnavailableConfirmed(FachBestaetigung {
                    message: format!("Vous n'êtes plus disponible pour {fach}"),
                    matiere: fach.clone(),
                }),
            );
            tracing::info!(client_id = %id, fach = %fach, "Lehrer nicht mehr verfuegbar");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Clash
    // -----------------------------------------------------------------------

    /// `clashAccepted`
    pub fn clash_annehmen(
        &mut self,
        id: &ClientId,
        anfrage: &ClashAnnahme,
        jetzt: Instant,
    ) -> MatchingResult<()> {
        let match_id = anfrage.match_id.ok_or(MatchingError::MatchNichtGefunden)?;

        match self
            .clash
            .annehmen(&match_id, id, anfrage.debate_question.as_ref(), jetzt)?
        {
            Annahme::Wartend => {
                tracing::debug!(match_id = %match_id, client_id = %id, "Clash angenommen, Partner ausstehend");
            }
            Annahme::BereitsBestaetigt => {
                tracing::debug!(match_id = %match_id, client_id = %id, "Clash bereits bestaetigt");
            }
            Annahme::Bestaetigt(sitzung) => {
                let nachricht = ServerNachricht::ClashBothAccepted(ClashBestaetigt {
                    meet_link: sitzung.raum.link.clone(),
                    meet_id: sitzung.raum.id.clone(),
                    debate_question: sitzung.debattenfrage.clone(),
                });
                for teilnehmer in sitzung.teilnehmer {
                    self.registry.senden(&teilnehmer, nachricht.clone());
                    self.clash_suche_beenden(&teilnehmer);
                }
                self.metriken.clash_ausgang_zaehlen("bestaetigt");
            }
        }
        Ok(())
    }

    /// `clashRefused`
    pub fn clash_ablehnen(&mut self, id: &ClientId, anfrage: &ClashAblehnung) -> MatchingResult<()> {
        let match_id = anfrage.match_id.ok_or(MatchingError::MatchNichtGefunden)?;
        let partner = self.clash.ablehnen(&match_id, id)?;

        self.partner_abgelehnt_melden(&partner);
        self.clash_suche_beenden(id);
        Ok(())
    }

    fn partner_abgelehnt_melden(&mut self, partner: &ClientId) {
        self.registry.senden(
            partner,
            ServerNachricht::ClashPartnerRefused(Hinweis {
                message: TEXT_PARTNER_ABGELEHNT.to_string(),
            }),
        );
        self.clash_suche_beenden(partner);
        self.metriken.clash_ausgang_zaehlen("abgelehnt");
    }

    /// Beendet die Debatten-Suche eines Clash-Teilnehmers
    ///
    /// Eine inzwischen gestartete Suche anderen Typs bleibt bestehen. Sonst
    /// verlaesst der Teilnehmer alle Warteschlangen, bevor die Suche
    /// geloescht wird.
    fn clash_suche_beenden(&mut self, id: &ClientId) {
        let debatte = match self.registry.get(id) {
            Some(c) => c.suche.as_ref().map_or(true, |s| s.typ.ist_clash()),
            None => return,
        };
        if !debatte {
            tracing::debug!(client_id = %id, "Neuere Suche bleibt nach Clash-Ende bestehen");
            return;
        }

        self.suche_verlassen(id);
        if let Some(c) = self.registry.get_mut(id) {
            c.suche_beenden();
        }
        self.warteschlangen_metrik();
    }

    // -----------------------------------------------------------------------
    // Warteschlangen-Status
    // -----------------------------------------------------------------------

    /// Sendet `queueUpdate` an alle Mitglieder der angegebenen Schluessel
    fn warteschlangen_status_senden(&self, keys: &[QueueKey]) {
        for key in keys {
            let mitglieder = self.queues.mitglieder(key);
            let groesse = mitglieder.len();
            for (index, mitglied) in mitglieder.iter().enumerate() {
                self.registry.senden(
                    mitglied,
                    ServerNachricht::QueueUpdate(WarteschlangenStatus {
                        queue_position: index + 1,
                        queue_size: groesse,
                        message: format!("{groesse} utilisateur(s) en attente dans cette file"),
                    }),
                );
            }
        }
    }

    fn warteschlangen_metrik(&self) {
        self.metriken
            .queue_entries
            .set((self.queues.eintraege() + self.lehrer.wartende()) as i64);
    }
}
