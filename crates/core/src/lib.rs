//! lokin-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Identifikationstypen bereit, die vom Protokoll-
//! und vom Matching-Crate gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ClientId, MatchId};
