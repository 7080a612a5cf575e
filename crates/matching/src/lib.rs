//! lokin-matching – Vermittlung, Presence und WebSocket-Layer
//!
//! Dieser Crate implementiert den Matching-Service von LOK IN. Er verwaltet
//! WebSocket-Verbindungen, Such-Warteschlangen, das Lehrer-Verzeichnis,
//! den Clash-Handshake und die Positions-Verteilung.
//!
//! ## Architektur
//!
//! ```text
//! WsServer (axum, `/` und `/ws`)
//!     |
//!     v
//! verbindung_verarbeiten (pro Socket ein Task, Reader + Writer)
//!     |  EngineBefehl: Verbunden / Nachricht / Getrennt
//!     v
//! MatchingService (ein Task, besitzt die Engine, Reaper-Tick im select!)
//!     |
//!     v
//! dispatcher -> MatchingEngine
//!     +-- ConnectionRegistry  (Verbindungen, Identitaet, Suchzustand)
//!     +-- PeerQueues          (FIFO je activity:sprache)
//!     +-- TeacherDirectory    (Lehrer und wartende Schueler je Fach)
//!     +-- ClashCoordinator    (beidseitige Annahme fuer Debatten)
//!     +-- presence            (userList-Snapshot an alle)
//! ```
//!
//! Der gesamte Zustand gehoert genau einem Task. Handler und Reaper laufen
//! nacheinander und ohne Locks.

pub mod broadcast;
pub mod clash;
pub mod connection;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod meet;
pub mod presence;
pub mod queues;
pub mod registry;
pub mod service;
pub mod teachers;
pub mod ws;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use broadcast::{Ausgehend, ClientSender};
pub use engine::{EngineKonfig, MatchingEngine};
pub use error::{MatchingError, MatchingResult};
pub use service::{EngineBefehl, EngineHandle, MatchingService};
pub use ws::{ws_router, WsServer, WsState};
