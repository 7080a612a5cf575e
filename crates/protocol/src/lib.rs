//! lokin-protocol – WebSocket-Protokoll-Definitionen
//!
//! Dieses Crate definiert alle JSON-Nachrichten die zwischen Browser-Client
//! und Matching-Server ausgetauscht werden.

pub mod control;

pub use control::{
    BenutzerEintrag, ClientNachricht, MatchGefunden, Partner, ServerNachricht, SuchTyp,
};
