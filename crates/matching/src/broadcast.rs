//! Ausgehende Nachrichten – Send-Queue pro Verbindung
//!
//! Jede Verbindung bekommt eine begrenzte mpsc-Queue. Die Engine schreibt
//! per `try_send` hinein, der Writer-Task des Sockets liest daraus. Eine
//! volle oder geschlossene Queue fuehrt nie zu einem Fehler beim Aufrufer.

use lokin_core::types::ClientId;
use lokin_protocol::ServerNachricht;
use tokio::sync::mpsc;

/// Standardgroesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Eintrag in der Send-Queue eines Clients
#[derive(Debug, Clone)]
pub enum Ausgehend {
    /// JSON-Nachricht an den Client
    Nachricht(ServerNachricht),
    /// Socket schliessen (Reaper)
    Schliessen,
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub client_id: ClientId,
    pub tx: mpsc::Sender<Ausgehend>,
}

impl ClientSender {
    /// Erstellt Sender und Empfangs-Queue fuer eine neue Verbindung
    pub fn kanal(client_id: ClientId, groesse: usize) -> (Self, mpsc::Receiver<Ausgehend>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self { client_id, tx }, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        let typ = nachricht.typ_name();
        match self.tx.try_send(Ausgehend::Nachricht(nachricht)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.client_id, typ, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %self.client_id, typ, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }

    /// Fordert den Writer-Task auf, den Socket zu schliessen
    pub fn schliessen(&self) {
        let _ = self.tx.try_send(Ausgehend::Schliessen);
    }

    /// `true` sobald der Writer-Task beendet ist
    pub fn ist_geschlossen(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
