//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Vorrang vor der Config-Datei hat:
//! - `LOKIN_LOG_LEVEL`: Log-Level oder vollstaendige EnvFilter-Direktive
//! - `LOKIN_LOG_FORMAT`: `text` oder `json`

use tracing_subscriber::{fmt, EnvFilter};

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unbekannte Werte fallen auf `Text` zurueck
    pub fn aus_str(format: &str) -> Self {
        match format {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `level` und `format` stammen aus der Konfiguration und werden von
/// `LOKIN_LOG_LEVEL` / `LOKIN_LOG_FORMAT` ueberschrieben.
pub fn logging_initialisieren(level: &str, format: &str) {
    let level = std::env::var("LOKIN_LOG_LEVEL").unwrap_or_else(|_| level.to_string());
    let format = std::env::var("LOKIN_LOG_FORMAT").unwrap_or_else(|_| format.to_string());
    let filter = filter_erstellen(&level);

    match LogFormat::aus_str(&format) {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        LogFormat::Text => {
            fmt().with_env_filter(filter).with_target(false).init();
        }
    }
}

/// Baut den EnvFilter; ungueltige Direktiven fallen auf `info` zurueck.
/// Die Upgrade-Logs von hyper werden auf `warn` begrenzt.
fn filter_erstellen(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    match "hyper=warn".parse() {
        Ok(direktive) => filter.add_directive(direktive),
        Err(_) => filter,
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level} muss gueltig sein");
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO"));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("JSON"));
        assert_eq!(LogFormat::aus_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::aus_str("xml"), LogFormat::Text);
    }

    #[test]
    fn filter_mit_direktive() {
        let filter = filter_erstellen("lokin_matching=debug,info");
        assert!(filter.to_string().contains("lokin_matching=debug"));
        assert!(filter.to_string().contains("hyper=warn"));
    }
}
