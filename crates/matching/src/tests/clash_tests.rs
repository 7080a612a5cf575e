//! Clash-Handshake fuer Debatten

use lokin_protocol::{ServerNachricht, SuchTyp};
use std::time::{Duration, Instant};

use super::{ablehnen, annehmen, engine, fehler, match_gefunden, senden, suche, verbinden, TestClient};
use crate::engine::{EngineKonfig, MatchingEngine};
use crate::queues::QueueKey;

/// Bringt zwei Clients in eine offene Clash-Sitzung
fn debatte(engine: &mut MatchingEngine, jetzt: Instant) -> (TestClient, TestClient, lokin_core::types::MatchId) {
    let mut a = verbinden(engine, jetzt);
    let mut b = verbinden(engine, jetzt);
    senden(engine, &a, &suche("debat", &["fr", "en"]), jetzt);
    senden(engine, &b, &suche("debat", &["en"]), jetzt);

    let ma = match_gefunden(&a.nachrichten()).expect("A braucht matchFound");
    let mb = match_gefunden(&b.nachrichten()).expect("B braucht matchFound");
    assert_eq!(ma.match_id, mb.match_id);
    let match_id = ma.match_id.expect("Debatten haben eine matchId");
    (a, b, match_id)
}

#[test]
fn debatten_szenario_bestaetigt_nach_beiden_annahmen() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (mut a, mut b, match_id) = debatte(&mut engine, jetzt);

    // Bis zur Bestaetigung suchen beide weiter
    assert!(engine.registry().get(&a.id).unwrap().sucht);
    assert!(engine.registry().get(&b.id).unwrap().sucht);
    assert!(!engine.queues().enthaelt(&a.id));

    senden(&mut engine, &a, &annehmen(match_id), jetzt);
    assert!(a.nachrichten().is_empty());
    assert!(b.nachrichten().is_empty());

    senden(&mut engine, &b, &annehmen(match_id), jetzt);
    let fuer_a = a.nachrichten();
    let fuer_b = b.nachrichten();
    let link = |n: &[ServerNachricht]| match n {
        [ServerNachricht::ClashBothAccepted(c)] => c.meet_link.clone(),
        andere => panic!("Erwartet genau clashBothAccepted, war {andere:?}"),
    };
    assert_eq!(link(fuer_a.as_slice()), link(fuer_b.as_slice()));

    assert!(!engine.registry().get(&a.id).unwrap().sucht);
    assert!(engine.registry().get(&b.id).unwrap().suche.is_none());

    // Doppelte Annahme nach Bestaetigung: nichts passiert
    senden(&mut engine, &a, &annehmen(match_id), jetzt);
    assert!(a.nachrichten().is_empty());
}

#[test]
fn erste_debattenfrage_gewinnt() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (mut a, b, match_id) = debatte(&mut engine, jetzt);

    let mit_frage = |frage: &str| {
        format!(
            r#"{{"type":"clashAccepted","matchId":"{}","debateQuestion":"{frage}"}}"#,
            match_id.inner()
        )
    };
    senden(&mut engine, &a, &mit_frage("Le sport à l'école ?"), jetzt);
    senden(&mut engine, &b, &mit_frage("Autre chose"), jetzt);

    match a.nachrichten().as_slice() {
        [ServerNachricht::ClashBothAccepted(c)] => {
            assert_eq!(c.debate_question.as_deref(), Some("Le sport à l'école ?"));
        }
        andere => panic!("Erwartet clashBothAccepted, war {andere:?}"),
    }
}

#[test]
fn ablehnung_benachrichtigt_nur_den_partner() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (mut a, mut b, match_id) = debatte(&mut engine, jetzt);

    senden(&mut engine, &a, &ablehnen(match_id), jetzt);

    assert!(a.nachrichten().is_empty());
    match b.nachrichten().as_slice() {
        [ServerNachricht::ClashPartnerRefused(h)] => {
            assert_eq!(h.message, "Votre partenaire a refusé le Clash");
        }
        andere => panic!("Erwartet genau clashPartnerRefused, war {andere:?}"),
    }
    assert_eq!(engine.clash().anzahl(), 0);
    assert!(!engine.registry().get(&a.id).unwrap().sucht);
    assert!(!engine.registry().get(&b.id).unwrap().sucht);

    // Sitzung ist weg
    senden(&mut engine, &b, &annehmen(match_id), jetzt);
    assert_eq!(fehler(&b.nachrichten()), vec!["Match non trouvé".to_string()]);
}

#[test]
fn ablehnung_nach_bestaetigung_ist_fehler() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (mut a, mut b, match_id) = debatte(&mut engine, jetzt);
    senden(&mut engine, &a, &annehmen(match_id), jetzt);
    senden(&mut engine, &b, &annehmen(match_id), jetzt);
    a.nachrichten();
    b.nachrichten();

    senden(&mut engine, &a, &ablehnen(match_id), jetzt);
    assert_eq!(fehler(&a.nachrichten()), vec!["Clash déjà confirmé".to_string()]);
    assert!(b.nachrichten().is_empty());
}

#[test]
fn fehlende_match_id_und_fremder_teilnehmer() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (_a, _b, match_id) = debatte(&mut engine, jetzt);
    let mut fremd = verbinden(&mut engine, jetzt);

    senden(&mut engine, &fremd, r#"{"type":"clashAccepted"}"#, jetzt);
    senden(&mut engine, &fremd, &annehmen(match_id), jetzt);
    senden(&mut engine, &fremd, &ablehnen(match_id), jetzt);

    assert_eq!(
        fehler(&fremd.nachrichten()),
        vec![
            "Match non trouvé".to_string(),
            "Utilisateur non impliqué dans ce match".to_string(),
            "Utilisateur non impliqué dans ce match".to_string(),
        ]
    );
    assert_eq!(engine.clash().anzahl(), 1);
}

#[test]
fn trennen_gilt_als_ablehnung() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (a, mut b, _match_id) = debatte(&mut engine, jetzt);

    assert!(engine.trennen(&a.id));

    let fuer_b = b.nachrichten();
    assert_eq!(
        fuer_b.iter().filter(|n| n.typ_name() == "clashPartnerRefused").count(),
        1
    );
    assert_eq!(engine.clash().anzahl(), 0);
    assert!(!engine.clash().enthaelt(&a.id));
    assert!(!engine.registry().get(&b.id).unwrap().sucht);
}

#[test]
fn bestaetigte_sitzung_nach_gnadenfrist_geloescht() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (a, b, match_id) = debatte(&mut engine, jetzt);
    senden(&mut engine, &a, &annehmen(match_id), jetzt);
    senden(&mut engine, &b, &annehmen(match_id), jetzt);

    engine.leerlauf_pruefen(jetzt + Duration::from_secs(30));
    assert!(engine.clash().get(&match_id).is_some());

    engine.leerlauf_pruefen(jetzt + Duration::from_secs(61));
    assert!(engine.clash().get(&match_id).is_none());
}

#[test]
fn offene_sitzung_laeuft_nur_mit_timeout_ab() {
    let jetzt = Instant::now();

    // Ohne Timeout bleibt die Sitzung offen
    let mut ohne = engine();
    let (_a, _b, match_id) = debatte(&mut ohne, jetzt);
    ohne.leerlauf_pruefen(jetzt + Duration::from_secs(200));
    assert!(ohne.clash().get(&match_id).is_some());

    let konfig = EngineKonfig {
        clash_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let mut mit = MatchingEngine::neu(konfig, super::metriken());
    let (mut a, mut b, match_id) = debatte(&mut mit, jetzt);

    mit.leerlauf_pruefen(jetzt + Duration::from_secs(31));
    assert!(mit.clash().get(&match_id).is_none());
    for client in [&mut a, &mut b] {
        assert_eq!(client.typen(), vec!["clashPartnerRefused"]);
    }
    assert!(!mit.registry().get(&a.id).unwrap().sucht);
}

#[test]
fn neuere_chat_suche_ueberlebt_ablehnung() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (mut a, mut b, match_id) = debatte(&mut engine, jetzt);

    // B sucht waehrend der offenen Debatte schon einen Chat
    senden(&mut engine, &b, &suche("chat", &["fr", "en"]), jetzt);
    b.nachrichten();
    senden(&mut engine, &a, &ablehnen(match_id), jetzt);

    assert_eq!(b.typen(), vec!["clashPartnerRefused"]);
    let cb = engine.registry().get(&b.id).unwrap();
    assert!(cb.sucht);
    assert_eq!(cb.suche.as_ref().map(|s| s.typ), Some(SuchTyp::Chat));
    assert!(engine.queues().enthaelt(&b.id));
    assert!(!engine.registry().get(&a.id).unwrap().sucht);
    a.nachrichten();

    let mut c = verbinden(&mut engine, jetzt);
    senden(&mut engine, &c, &suche("chat", &["fr"]), jetzt);
    let fuer_c = match_gefunden(&c.nachrichten()).expect("C muss B finden");
    assert_eq!(fuer_c.partner.name, format!("Utilisateur {}", b.id.kurz()));
    assert!(!engine.queues().enthaelt(&b.id));
}

#[test]
fn neue_debatten_suche_verlaesst_warteschlangen_bei_ablehnung() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let (a, mut b, match_id) = debatte(&mut engine, jetzt);

    senden(&mut engine, &b, &suche("debat", &["de"]), jetzt);
    let key = QueueKey::neu(SuchTyp::Debat, "de");
    assert_eq!(engine.queues().laenge(&key), 1);
    b.nachrichten();

    senden(&mut engine, &a, &ablehnen(match_id), jetzt);

    // Keine Suche ohne Warteschlange und kein Eintrag ohne Suche
    let cb = engine.registry().get(&b.id).unwrap();
    assert!(!cb.sucht);
    assert!(cb.suche.is_none());
    assert!(!engine.queues().enthaelt(&b.id));
    assert_eq!(engine.queues().laenge(&key), 0);

    // stopSearch bleibt danach folgenlos
    senden(&mut engine, &b, r#"{"type":"stopSearch"}"#, jetzt);
    assert_eq!(b.typen(), vec!["clashPartnerRefused"]);
}

#[test]
fn zeitueberschreitung_raeumt_neue_debatten_suche_ab() {
    let konfig = EngineKonfig {
        clash_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let mut engine = MatchingEngine::neu(konfig, super::metriken());
    let jetzt = Instant::now();
    let (_a, b, match_id) = debatte(&mut engine, jetzt);

    senden(&mut engine, &b, &suche("debat", &["it"]), jetzt);
    engine.leerlauf_pruefen(jetzt + Duration::from_secs(31));

    assert!(engine.clash().get(&match_id).is_none());
    assert!(!engine.queues().enthaelt(&b.id));
    assert!(!engine.registry().get(&b.id).unwrap().sucht);
}
