//! Client-Session – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede aufgewertete Verbindung bekommt eine `ClientSession` in einem
//! eigenen tokio-Task. Nachrichten laufen durch den Dispatcher,
//! Ereignisse anderer Teilnehmer kommen ueber die Broadcaster-Queue.
//!
//! ## Lebenslauf
//! ```text
//! Verbunden -> Gebunden (join-room) -> Getrennt
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping-Frame
//! - Jeder eingehende Frame zaehlt als Lebenszeichen
//! - Ohne Lebenszeichen fuer `verbindungs_timeout_sek` wird getrennt

use axum::extract::ws::{Message, WebSocket};
use palaver_protocol::control::{ClientMessage, RoomClosedEvent, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::dispatcher::{MessageDispatcher, SessionContext};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
///
/// Liest Text-Frames, dispatcht an den `MessageDispatcher` und schreibt
/// Antworten und Broadcaster-Ereignisse zurueck. Laeuft in einem
/// eigenen tokio-Task.
pub struct ClientSession {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientSession {
    /// Erstellt eine neue ClientSession
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung endet, die Empfangs-Queue geschlossen
    /// wird (Kick oder Raum-Aufloesung) oder ein Shutdown-Signal kommt.
    pub async fn verarbeiten(self, mut socket: WebSocket) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);
        let mut shutdown_rx = self.state.shutdown_rx.clone();

        tracing::info!(peer = %peer_addr, "Neue WebSocket-Verbindung");

        let mut ctx = SessionContext::neu(peer_addr);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        // Empfangs-Queue des Broadcasters, vorhanden sobald gebunden
        let mut empfangs_queue: Option<mpsc::Receiver<ServerMessage>> = None;

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            // Timeout-Pruefung
            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                break;
            }

            // Naechsten Ping-Zeitpunkt berechnen
            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehender Frame vom Client
                frame = socket.recv() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();

                            let antwort = match ClientMessage::from_json(&text) {
                                Ok(nachricht) => dispatcher.dispatch(nachricht, &mut ctx),
                                Err(e) => {
                                    tracing::debug!(peer = %peer_addr, fehler = %e, "Unlesbare Nachricht");
                                    Some(ServerMessage::error("Ungueltige Nachricht"))
                                }
                            };
                            if let Some(antwort) = antwort {
                                if Self::senden(&mut socket, &antwort, peer_addr).await.is_err() {
                                    break;
                                }
                            }

                            // Beim Binden registrierte Queue uebernehmen
                            if let Some(queue) = ctx.empfangs_queue.take() {
                                empfangs_queue = Some(queue);
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            letzter_empfang = Instant::now();
                            let fehler = ServerMessage::error("Nur Text-Frames werden unterstuetzt");
                            if Self::senden(&mut socket, &fehler, peer_addr).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            // axum beantwortet Pings selbst, hier zaehlt das Lebenszeichen
                            letzter_empfang = Instant::now();
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client geschlossen");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ereignis aus dem Broadcaster
                ausgehend = Self::naechstes_ereignis(&mut empfangs_queue) => {
                    match ausgehend {
                        Some(ereignis) => {
                            if Self::senden(&mut socket, &ereignis, peer_addr).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            // Queue geschlossen: gekickt oder Raum aufgeloest
                            tracing::info!(peer = %peer_addr, "Empfangs-Queue geschlossen, Verbindung wird beendet");
                            break;
                        }
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        if socket.send(Message::Ping(Vec::new())).await.is_err() {
                            tracing::warn!(peer = %peer_addr, "Ping-Senden fehlgeschlagen");
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerMessage::RoomClosed(RoomClosedEvent {
                            reason: "Server wird heruntergefahren".to_string(),
                        });
                        let _ = Self::senden(&mut socket, &abschied, peer_addr).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        dispatcher.session_cleanup(&ctx);

        tracing::info!(peer = %peer_addr, "Session-Task beendet");
    }

    /// Wartet auf das naechste Broadcaster-Ereignis
    ///
    /// Vor der Bindung gibt es keine Queue, dann wartet dieser Zweig
    /// einfach still weiter.
    async fn naechstes_ereignis(
        queue: &mut Option<mpsc::Receiver<ServerMessage>>,
    ) -> Option<ServerMessage> {
        match queue.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Serialisiert ein Ereignis und schreibt es als Text-Frame
    async fn senden(
        socket: &mut WebSocket,
        nachricht: &ServerMessage,
        peer_addr: SocketAddr,
    ) -> SignalingResult<()> {
        let json = nachricht.to_json()?;
        match socket.send(Message::Text(json)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                Err(SignalingError::WebSocket(e))
            }
        }
    }
}
