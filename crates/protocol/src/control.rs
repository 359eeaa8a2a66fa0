//! Signal-Protokoll (WebSocket)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Ereignis-Protokoll ohne Request/Response-Zuordnung: jede Nachricht
//!   steht fuer sich
//! - JSON-Serialisierung via serde, intern getaggt ueber das `type`-Feld
//! - Getrennte Enums pro Richtung: Relay-Nachrichten wechseln beim
//!   Weiterleiten die Form (Client sendet `target`, der Server ersetzt
//!   es durch `sender`)
//! - SDP- und Kandidaten-Blobs bleiben opak (`serde_json::Value`), der
//!   Server schaut nie hinein

use palaver_core::types::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Teilnehmer-Schnappschuss
// ---------------------------------------------------------------------------

/// Teilnehmer-Zustand wie er auf der Leitung erscheint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub is_host: bool,
    pub is_audio_muted: bool,
    pub is_video_enabled: bool,
    pub is_screen_sharing: bool,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Raum-Beitritt: bindet die Verbindung an einen per REST angelegten Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: RoomId,
    /// Die bei `POST /api/rooms/{id}/join` vergebene Teilnehmer-ID
    pub user_id: ParticipantId,
}

/// Session-Angebot zur Weiterleitung an einen Ziel-Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRelay {
    pub target: ParticipantId,
    /// Opakes Session-Angebot (SDP), wird unveraendert weitergereicht
    pub offer: serde_json::Value,
}

/// Session-Antwort zur Weiterleitung an einen Ziel-Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRelay {
    pub target: ParticipantId,
    pub answer: serde_json::Value,
}

/// Transport-Kandidat zur Weiterleitung an einen Ziel-Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateRelay {
    pub target: ParticipantId,
    pub candidate: serde_json::Value,
}

/// Mikrofon stummschalten bzw. freigeben
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAudioRequest {
    pub is_audio_muted: bool,
}

/// Kamera ein- bzw. ausschalten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleVideoRequest {
    pub is_video_enabled: bool,
}

/// Bildschirmfreigabe starten bzw. beenden
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleScreenShareRequest {
    pub is_screen_sharing: bool,
}

/// Teilnehmer aus dem Raum entfernen (nur Host)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickParticipantRequest {
    pub user_id: ParticipantId,
    /// Ohne Angabe setzt der Server einen Standardgrund ein
    pub reason: Option<String>,
}

/// Chat-Nachricht an alle Teilnehmer des Raums
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendRequest {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ClientMessage
// ---------------------------------------------------------------------------

/// Alle Nachrichten die ein Client senden darf
///
/// Unbekannte `type`-Werte scheitern bereits beim Deserialisieren,
/// nicht erst im Dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom(JoinRoomRequest),

    // Verbindungsaufbau zwischen Teilnehmern
    Offer(OfferRelay),
    Answer(AnswerRelay),
    IceCandidate(IceCandidateRelay),

    // Medienzustand
    ToggleAudio(ToggleAudioRequest),
    ToggleVideo(ToggleVideoRequest),
    ToggleScreenShare(ToggleScreenShareRequest),

    // Moderation
    KickParticipant(KickParticipantRequest),

    // Chat
    ChatMessage(ChatSendRequest),
}

impl ClientMessage {
    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Vollstaendige Teilnehmerliste nach erfolgreichem Beitritt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomParticipantsEvent {
    /// Alle Teilnehmer des Raums, den Empfaenger eingeschlossen
    pub participants: Vec<ParticipantInfo>,
}

/// Ein neuer Teilnehmer ist dem Raum beigetreten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedEvent {
    pub participant: ParticipantInfo,
}

/// Ein Teilnehmer hat den Raum verlassen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftEvent {
    pub user_id: ParticipantId,
}

/// Weitergeleitetes Session-Angebot, `target` wurde durch `sender` ersetzt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferEvent {
    pub sender: ParticipantId,
    pub offer: serde_json::Value,
}

/// Weitergeleitete Session-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub sender: ParticipantId,
    pub answer: serde_json::Value,
}

/// Weitergeleiteter Transport-Kandidat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateEvent {
    pub sender: ParticipantId,
    pub candidate: serde_json::Value,
}

/// Ein Teilnehmer hat sein Mikrofon umgeschaltet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioToggleEvent {
    pub user_id: ParticipantId,
    pub is_audio_muted: bool,
}

/// Ein Teilnehmer hat seine Kamera umgeschaltet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoToggleEvent {
    pub user_id: ParticipantId,
    pub is_video_enabled: bool,
}

/// Ein Teilnehmer hat seine Bildschirmfreigabe umgeschaltet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShareToggleEvent {
    pub user_id: ParticipantId,
    pub is_screen_sharing: bool,
}

/// Ein Teilnehmer wurde vom Host entfernt (geht an die Verbleibenden)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantKickedEvent {
    pub user_id: ParticipantId,
}

/// Der Empfaenger selbst wurde entfernt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickedEvent {
    pub reason: String,
}

/// Der Raum wurde geschlossen, die Verbindung endet danach
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedEvent {
    pub reason: String,
}

/// Die Host-Rolle ist auf einen anderen Teilnehmer uebergegangen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostChangedEvent {
    pub new_host_id: ParticipantId,
}

/// Chat-Nachricht mit serverseitig vergebener ID und Zeitstempel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    pub id: uuid::Uuid,
    pub user_id: ParticipantId,
    pub user_name: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Fehlermeldung an den Absender einer abgelehnten Nachricht
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ServerMessage
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Server an Clients schickt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    // Mitgliedschaft
    RoomParticipants(RoomParticipantsEvent),
    UserJoined(UserJoinedEvent),
    UserLeft(UserLeftEvent),

    // Weitergeleitete Verbindungsaushandlung
    Offer(OfferEvent),
    Answer(AnswerEvent),
    IceCandidate(IceCandidateEvent),

    // Medienzustand
    ParticipantAudioToggle(AudioToggleEvent),
    ParticipantVideoToggle(VideoToggleEvent),
    ParticipantScreenShareToggle(ScreenShareToggleEvent),

    // Moderation und Lebenszyklus
    ParticipantKicked(ParticipantKickedEvent),
    Kicked(KickedEvent),
    RoomClosed(RoomClosedEvent),
    HostChanged(HostChangedEvent),

    // Chat
    ChatMessage(ChatBroadcast),

    // Fehler
    Error(ErrorEvent),
}

impl ServerMessage {
    /// Erstellt eine Fehlermeldung
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            message: message.into(),
        })
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
