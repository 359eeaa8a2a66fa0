//! Raum-Broadcaster – Sendet Ereignisse an gebundene Verbindungen
//!
//! Der RoomBroadcaster verwaltet die Send-Queues aller gebundenen
//! Teilnehmer. Wer ein Ereignis bekommt entscheidet der Aufrufer: die
//! Handler reichen die Empfaengerliste aus dem gerade gehaltenen
//! Raum-Lock herein, damit Mitgliedschaft und Zustellung zueinander
//! passen.
//!
//! ## Selektives Broadcasting
//! - An einen Teilnehmer: `an_user_senden`
//! - An eine Empfaengerliste: `an_raum_senden`
//! - An eine Empfaengerliste ausser einem: `an_raum_ausser_senden`

use dashmap::DashMap;
use palaver_core::types::ParticipantId;
use palaver_protocol::control::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer gebundenen Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: ParticipantId,
    pub tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RoomBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle gebundenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
/// Das Schliessen einer Queue (`client_entfernen`) beendet die
/// zugehoerige Session-Schleife, nachdem bereits eingereihte
/// Nachrichten noch zugestellt wurden.
#[derive(Clone)]
pub struct RoomBroadcaster {
    inner: Arc<RoomBroadcasterInner>,
}

struct RoomBroadcasterInner {
    /// Send-Queues, indiziert nach Teilnehmer-ID
    clients: DashMap<ParticipantId, ClientSender>,
}

impl RoomBroadcaster {
    /// Erstellt einen neuen RoomBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RoomBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert eine gebundene Verbindung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientSession` liest aus dieser Queue und schreibt auf den
    /// WebSocket.
    pub fn client_registrieren(&self, user_id: ParticipantId) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender { user_id, tx };
        self.inner.clients.insert(user_id, sender);
        tracing::debug!(user_id = %user_id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Verbindung und schliesst damit ihre Queue
    pub fn client_entfernen(&self, user_id: &ParticipantId) {
        self.inner.clients.remove(user_id);
        tracing::debug!(user_id = %user_id, "Client aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an einen einzelnen Teilnehmer
    ///
    /// Gibt `true` zurueck wenn der Teilnehmer gebunden ist und die
    /// Nachricht eingereiht wurde.
    pub fn an_user_senden(&self, user_id: &ParticipantId, nachricht: ServerMessage) -> bool {
        match self.inner.clients.get(user_id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(user_id = %user_id, "Senden an ungebundenen Teilnehmer");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle angegebenen Teilnehmer
    ///
    /// Noch nicht gebundene Teilnehmer werden uebersprungen. Gibt die
    /// Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_raum_senden(&self, mitglieder: &[ParticipantId], nachricht: ServerMessage) -> usize {
        let mut gesendet = 0;
        for user_id in mitglieder {
            if let Some(sender) = self.inner.clients.get(user_id) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Sendet eine Nachricht an alle angegebenen Teilnehmer ausser einem
    ///
    /// Nuetzlich um Zustandsaenderungen zu verteilen ohne den Ausloeser
    /// zu informieren.
    pub fn an_raum_ausser_senden(
        &self,
        mitglieder: &[ParticipantId],
        ausgeschlossen: &ParticipantId,
        nachricht: ServerMessage,
    ) -> usize {
        let mut gesendet = 0;
        for user_id in mitglieder {
            if user_id == ausgeschlossen {
                continue;
            }
            if let Some(sender) = self.inner.clients.get(user_id) {
                if sender.senden(nachricht.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Gibt die Anzahl der gebundenen Verbindungen zurueck
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Teilnehmer gebunden ist
    pub fn ist_registriert(&self, user_id: &ParticipantId) -> bool {
        self.inner.clients.contains_key(user_id)
    }
}

impl Default for RoomBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
