//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Die Umgebungsvariable `PORT` ueberschreibt den
//! WebSocket-Port.

use lokin_matching::EngineKonfig;
use lokin_observability::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Vermittlung: Timeouts, Reaper, Meet-Links
    pub vermittlung: VermittlungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger WebSocket-Verbindungen
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "LOK IN".into(),
            max_clients: 1000,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Listener
    pub bind_adresse: String,
    /// Port fuer WebSocket-Verbindungen
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Vermittlungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VermittlungsEinstellungen {
    /// Stille in Sekunden, nach der eine Verbindung getrennt wird
    pub leerlauf_timeout_sek: u64,
    /// Abstand der Reaper-Durchlaeufe in Sekunden
    pub reaper_intervall_sek: u64,
    /// Lebensdauer bestaetigter Clash-Sitzungen in Sekunden
    pub clash_gnadenfrist_sek: u64,
    /// Abbruch offener Clash-Sitzungen (leer = nie)
    pub clash_timeout_sek: Option<u64>,
    /// Basis-URL der Meet-Links, die Raum-ID wird angehaengt
    pub meet_basis_url: String,
    /// Ausgehende Nachrichten pro Verbindung, die gepuffert werden
    pub send_queue_groesse: usize,
}

impl Default for VermittlungsEinstellungen {
    fn default() -> Self {
        let engine = EngineKonfig::default();
        Self {
            leerlauf_timeout_sek: engine.leerlauf_timeout.as_secs(),
            reaper_intervall_sek: 30,
            clash_gnadenfrist_sek: engine.clash_gnadenfrist.as_secs(),
            clash_timeout_sek: None,
            meet_basis_url: engine.meet_basis_url,
            send_queue_groesse: lokin_matching::broadcast::SEND_QUEUE_GROESSE,
        }
    }
}

impl VermittlungsEinstellungen {
    /// Uebersetzt die Einstellungen in die Engine-Konfiguration
    pub fn engine_konfig(&self) -> EngineKonfig {
        EngineKonfig {
            leerlauf_timeout: Duration::from_secs(self.leerlauf_timeout_sek),
            clash_gnadenfrist: Duration::from_secs(self.clash_gnadenfrist_sek),
            clash_timeout: self.clash_timeout_sek.map(Duration::from_secs),
            meet_basis_url: self.meet_basis_url.clone(),
        }
    }

    /// Reaper-Intervall, mindestens eine Sekunde
    pub fn reaper_intervall(&self) -> Duration {
        Duration::from_secs(self.reaper_intervall_sek.max(1))
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

/// Herkunft einer geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KonfigQuelle {
    Datei,
    /// Datei fehlte, alle Werte sind Standardwerte
    Standardwerte,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    /// Danach wird `PORT` aus der Umgebung angewendet.
    /// Die `KonfigQuelle` meldet, ob die Datei gefehlt hat.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, KonfigQuelle)> {
        let (mut config, quelle) = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => (
                Self::aus_toml(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
                KonfigQuelle::Datei,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), KonfigQuelle::Standardwerte)
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(port) = std::env::var("PORT") {
            config.port_ueberschreiben(&port)?;
        }
        config.validieren()?;
        Ok((config, quelle))
    }

    /// Prueft Werte, mit denen der Server nicht sinnvoll laufen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.server.max_clients == 0 {
            anyhow::bail!("server.max_clients muss groesser als 0 sein");
        }
        let v = &self.vermittlung;
        if v.leerlauf_timeout_sek == 0 {
            anyhow::bail!("vermittlung.leerlauf_timeout_sek muss groesser als 0 sein");
        }
        if v.clash_timeout_sek == Some(0) {
            anyhow::bail!("vermittlung.clash_timeout_sek darf nicht 0 sein");
        }
        if v.meet_basis_url.trim().is_empty() {
            anyhow::bail!("vermittlung.meet_basis_url fehlt");
        }
        // Direktiven wie "lokin_matching=debug" sind erlaubt
        let level = &self.logging.level;
        if !log_level_gueltig(level) && !level.contains('=') {
            anyhow::bail!("Ungueltiges Log-Level '{level}'");
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Parst eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Setzt den WebSocket-Port aus einem Umgebungswert
    pub fn port_ueberschreiben(&mut self, wert: &str) -> anyhow::Result<()> {
        let port: u16 = wert
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltiger PORT '{wert}': {e}"))?;
        self.netzwerk.port = port;
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer den WebSocket-Server zurueck
    pub fn ws_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Parst beide Bind-Adressen
    pub fn socket_adressen(&self) -> anyhow::Result<(SocketAddr, SocketAddr)> {
        let ws = self
            .ws_bind_adresse()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{}': {e}", self.ws_bind_adresse()))?;
        let obs = self.observability_bind_adresse().parse().map_err(|e| {
            anyhow::anyhow!(
                "Ungueltige Bind-Adresse '{}': {e}",
                self.observability_bind_adresse()
            )
        })?;
        Ok((ws, obs))
    }
}
