//! Presence-Snapshots

use lokin_protocol::control::BenutzerListe;
use lokin_protocol::ServerNachricht;
use std::time::Instant;

use super::{engine, fehler, senden, verbinden};

fn position(lat: f64, lng: f64, name: &str) -> String {
    format!(r#"{{"type":"updatePosition","lat":{lat},"lng":{lng},"name":"{name}"}}"#)
}

/// Letzter `userList`-Frame aus einer Nachrichtenliste
fn letzte_liste(nachrichten: &[ServerNachricht]) -> Option<BenutzerListe> {
    nachrichten.iter().rev().find_map(|n| match n {
        ServerNachricht::UserList(l) => Some(l.clone()),
        _ => None,
    })
}

#[test]
fn alle_sehen_die_neuesten_positionen() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut clients: Vec<_> = (0..3).map(|_| verbinden(&mut engine, jetzt)).collect();
    let erster_id = clients[0].id;

    for (i, c) in clients.iter().enumerate() {
        senden(&mut engine, c, &position(48.0 + i as f64, 2.0, &format!("Nutzer {i}")), jetzt);
    }
    // Zweites Update ueberschreibt das erste
    senden(&mut engine, &clients[0], &position(43.3, 5.4, "Nutzer 0"), jetzt);

    for c in clients.iter_mut() {
        let liste = letzte_liste(&c.nachrichten()).expect("Jeder Client braucht eine userList");
        assert_eq!(liste.count, 3);
        assert_eq!(liste.users.len(), 3);

        let erster = liste
            .users
            .iter()
            .find(|u| u.id == erster_id)
            .expect("Client 0 fehlt im Snapshot");
        assert_eq!((erster.lat, erster.lng), (43.3, 5.4));
        assert_eq!(erster.name, "Nutzer 0");
        assert!(erster.last_update_time > 0);
    }
}

#[test]
fn ohne_position_nicht_im_snapshot() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);
    let b = verbinden(&mut engine, jetzt);

    senden(&mut engine, &b, &position(45.75, 4.85, "Lyon"), jetzt);

    let liste = letzte_liste(&a.nachrichten()).expect("A braucht eine userList");
    assert_eq!(liste.count, 1);
    assert_eq!(liste.users[0].id, b.id);
}

#[test]
fn name_faellt_auf_kurzform_zurueck() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, r#"{"type":"updatePosition","lat":10,"lng":20}"#, jetzt);

    let liste = letzte_liste(&a.nachrichten()).expect("A braucht eine userList");
    assert_eq!(liste.users[0].name, format!("Utilisateur {}", a.id.kurz()));
}

#[test]
fn ungueltige_positionen() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, &position(91.0, 0.0, "X"), jetzt);
    senden(&mut engine, &a, &position(0.0, -180.5, "X"), jetzt);
    senden(&mut engine, &a, r#"{"type":"updatePosition","lat":1}"#, jetzt);

    let nachrichten = a.nachrichten();
    assert_eq!(
        fehler(&nachrichten),
        vec!["Latitude et longitude invalides".to_string(); 3]
    );
    assert!(letzte_liste(&nachrichten).is_none());
    assert!(engine.registry().get(&a.id).unwrap().position.is_none());

    senden(&mut engine, &a, r#"{"type":"updatePosition","lat":"abc","lng":2}"#, jetzt);
    let f = fehler(&a.nachrichten());
    assert_eq!(f.len(), 1);
    assert!(f[0].starts_with("Message invalide"));
}

#[test]
fn request_user_list_nur_an_den_anfragenden() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);
    let mut b = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, &position(1.0, 1.0, "A"), jetzt);
    a.nachrichten();
    b.nachrichten();

    senden(&mut engine, &b, r#"{"type":"requestUserList"}"#, jetzt);
    assert!(a.nachrichten().is_empty());
    let liste = letzte_liste(&b.nachrichten()).expect("B braucht eine userList");
    assert_eq!(liste.count, 1);
}

#[test]
fn trennen_verteilt_neuen_snapshot() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);
    let b = verbinden(&mut engine, jetzt);

    senden(&mut engine, &a, &position(1.0, 1.0, "A"), jetzt);
    senden(&mut engine, &b, &position(2.0, 2.0, "B"), jetzt);
    a.nachrichten();

    engine.trennen(&b.id);
    let liste = letzte_liste(&a.nachrichten()).expect("A braucht eine neue userList");
    assert_eq!(liste.count, 1);
    assert_eq!(liste.users[0].id, a.id);
}

#[test]
fn geschlossene_verbindung_bekommt_keinen_snapshot() {
    let mut engine = engine();
    let jetzt = Instant::now();
    let mut a = verbinden(&mut engine, jetzt);
    let b = verbinden(&mut engine, jetzt);
    let b_id = b.id;
    drop(b);

    senden(&mut engine, &a, &position(1.0, 1.0, "A"), jetzt);
    assert!(letzte_liste(&a.nachrichten()).is_some());
    assert!(!engine.registry().ist_lebendig(&b_id));
}
