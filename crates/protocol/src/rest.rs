//! REST-Datentypen fuer die Raum-Verwaltung
//!
//! Der Raum-Lebenszyklus (anlegen, beitreten, abfragen, schliessen)
//! laeuft ueber HTTP, erst danach bindet der Client seine
//! WebSocket-Verbindung an den vergebenen Teilnehmer.
//!
//! Alle Antworten tragen ein `success`-Feld; Fehlerfaelle antworten
//! mit `{"success": false, "error": "..."}` und passendem Statuscode.

use palaver_core::types::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};

use crate::control::ParticipantInfo;

/// Raum anlegen (`POST /api/rooms/create`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Anzeigename des Erstellers, wird der erste Host
    pub host_name: String,
}

/// Antwort auf die Raum-Erstellung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub success: bool,
    pub room_id: RoomId,
    /// Teilnehmer-ID des Erstellers fuer den anschliessenden `join-room`
    pub host_id: ParticipantId,
}

/// Raum beitreten (`POST /api/rooms/{roomId}/join`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinRequest {
    pub user_name: String,
}

/// Antwort auf den Raum-Beitritt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinResponse {
    pub success: bool,
    pub user_id: ParticipantId,
}

/// Raum-Schnappschuss (`GET /api/rooms/{roomId}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub participants: Vec<ParticipantInfo>,
}

/// Antwort auf die Raum-Abfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoResponse {
    pub success: bool,
    pub room: RoomInfo,
}

/// Raum schliessen (`DELETE /api/rooms/{roomId}`, nur Host)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeleteRequest {
    pub user_id: ParticipantId,
}
