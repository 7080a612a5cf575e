//! Prometheus-kompatible Metriken fuer LOK IN
//!
//! Registrierte Metriken:
//! - `lokin_connected_clients` – Gauge: Aktuell verbundene Clients
//! - `lokin_queue_entries` – Gauge: Eintraege in allen Warteschlangen
//! - `lokin_matches_total` – Counter: Erzeugte Matches (typ)
//! - `lokin_clash_outcomes_total` – Counter: Clash-Ausgaenge (ergebnis)
//! - `lokin_idle_evictions_total` – Counter: Vom Reaper getrennte Verbindungen
//! - `lokin_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `lokin_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle LOK IN Prometheus-Metriken
///
/// Clone teilt die Registry; jede Instanz von `neu()` hat eine eigene,
/// damit Tests isoliert zaehlen koennen.
#[derive(Clone)]
pub struct LokinMetrics {
    pub registry: Arc<Registry>,

    // Matching-Metriken
    pub connected_clients: IntGauge,
    pub queue_entries: IntGauge,
    pub matches_total: IntCounterVec,
    pub clash_outcomes_total: IntCounterVec,
    pub idle_evictions_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl LokinMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Matching-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "lokin_connected_clients",
            "Anzahl aktuell verbundener Clients",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let queue_entries = IntGauge::with_opts(Opts::new(
            "lokin_queue_entries",
            "Eintraege in allen Peer- und Schueler-Warteschlangen",
        ))?;
        registry.register(Box::new(queue_entries.clone()))?;

        let matches_total = IntCounterVec::new(
            Opts::new("lokin_matches_total", "Gesamtanzahl erzeugter Matches"),
            &["typ"],
        )?;
        registry.register(Box::new(matches_total.clone()))?;

        let clash_outcomes_total = IntCounterVec::new(
            Opts::new(
                "lokin_clash_outcomes_total",
                "Ausgaenge von Clash-Sitzungen",
            ),
            &["ergebnis"],
        )?;
        registry.register(Box::new(clash_outcomes_total.clone()))?;

        let idle_evictions_total = IntCounter::with_opts(Opts::new(
            "lokin_idle_evictions_total",
            "Wegen Inaktivitaet getrennte Verbindungen",
        ))?;
        registry.register(Box::new(idle_evictions_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("lokin_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lokin_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            queue_entries,
            matches_total,
            clash_outcomes_total,
            idle_evictions_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Zaehlt ein Match des gegebenen Typs
    pub fn match_zaehlen(&self, typ: &str) {
        self.matches_total.with_label_values(&[typ]).inc();
    }

    /// Zaehlt einen Clash-Ausgang ("bestaetigt", "abgelehnt", "abgelaufen")
    pub fn clash_ausgang_zaehlen(&self, ergebnis: &str) {
        self.clash_outcomes_total.with_label_values(&[ergebnis]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: LokinMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<LokinMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
