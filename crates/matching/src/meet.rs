//! Meet-Raeume – Zufaellige Raum-IDs und Links fuer den Videocall
//!
//! Format der ID: drei Segmente aus Kleinbuchstaben, `xxx-xxxx-xxx`.

use rand::Rng;

/// Standard-Basis-URL, an die die Raum-ID angehaengt wird
pub const STANDARD_MEET_BASIS_URL: &str = "https://lokin.online/jitsi-room.html?room=";

const SEGMENTE: [usize; 3] = [3, 4, 3];

/// Ein erzeugter Raum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetRaum {
    pub id: String,
    pub link: String,
}

/// Erzeugt Raum-IDs und Links
#[derive(Debug, Clone)]
pub struct MeetGenerator {
    basis_url: String,
}

impl MeetGenerator {
    pub fn neu(basis_url: impl Into<String>) -> Self {
        Self {
            basis_url: basis_url.into(),
        }
    }

    /// Neuer Raum mit frischer ID
    pub fn neuer_raum(&self) -> MeetRaum {
        let id = raum_id_erzeugen();
        MeetRaum {
            link: format!("{}{}", self.basis_url, id),
            id,
        }
    }
}

impl Default for MeetGenerator {
    fn default() -> Self {
        Self::neu(STANDARD_MEET_BASIS_URL)
    }
}

/// Erzeugt eine ID im Format `xxx-xxxx-xxx`
pub fn raum_id_erzeugen() -> String {
    let mut rng = rand::thread_rng();
    SEGMENTE
        .iter()
        .map(|&laenge| {
            (0..laenge)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}
