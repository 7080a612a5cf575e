//! Client-Connection – Verarbeitet einen einzelnen WebSocket
//!
//! Jeder Socket bekommt einen eigenen Task. Der Socket wird in Reader und
//! Writer geteilt:
//! - Writer: liest die Send-Queue (`Ausgehend`) und schreibt JSON-Frames
//! - Reader: leitet Text-Frames als `EngineBefehl::Nachricht` weiter
//!
//! Endet der Writer (Reaper hat geschlossen, Registry hat den Sender
//! verworfen), endet auch der Reader. Beim Ende geht immer ein
//! `EngineBefehl::Getrennt` an die Engine.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use lokin_core::types::ClientId;
use tokio::sync::{mpsc, watch};

use crate::broadcast::{Ausgehend, ClientSender};
use crate::service::EngineHandle;

/// Verarbeitet eine WebSocket-Verbindung bis zum Ende
pub async fn verbindung_verarbeiten(
    socket: WebSocket,
    handle: EngineHandle,
    send_queue_groesse: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let client_id = ClientId::new();
    let (sender, ausgang_rx) = ClientSender::kanal(client_id, send_queue_groesse);
    let (ws_tx, mut ws_rx) = socket.split();

    if handle.verbunden(sender).await.is_err() {
        tracing::warn!(client_id = %client_id, "Engine nicht erreichbar – Verbindung verworfen");
        return;
    }

    let mut writer = tokio::spawn(writer_task(client_id, ws_tx, ausgang_rx));

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if handle.nachricht(client_id, text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(client_id = %client_id, grund = ?frame, "Client hat geschlossen");
                        break;
                    }
                    // Binary wird ignoriert, Ping/Pong beantwortet axum selbst
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(client_id = %client_id, fehler = %e, "WebSocket-Lesefehler");
                        break;
                    }
                    None => break,
                }
            }

            // Writer beendet (Reaper oder Sender verworfen)
            _ = &mut writer => {
                tracing::debug!(client_id = %client_id, "Writer beendet");
                break;
            }

            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::debug!(client_id = %client_id, "Shutdown-Signal – Verbindung wird getrennt");
                    break;
                }
            }
        }
    }

    let _ = handle.getrennt(client_id).await;
    writer.abort();
    tracing::debug!(client_id = %client_id, "Verbindungs-Task beendet");
}

/// Schreibt die Send-Queue auf den Socket
async fn writer_task(
    client_id: ClientId,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Ausgehend>,
) {
    while let Some(ausgehend) = rx.recv().await {
        match ausgehend {
            Ausgehend::Nachricht(nachricht) => {
                let json = match nachricht.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(client_id = %client_id, fehler = %e, "Serialisierung fehlgeschlagen");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
            Ausgehend::Schliessen => break,
        }
    }

    let _ = ws_tx
        .send(Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: "Inactivité".into(),
        })))
        .await;
}
