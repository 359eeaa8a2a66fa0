//! Chat-Handler – Textnachrichten im Raum
//!
//! Nachrichten werden nicht gespeichert, nur mit Server-Zeitstempel an
//! alle aktuellen Mitglieder verteilt. Der Absender bekommt sein
//! eigenes Echo und kann die Nachricht damit als zugestellt anzeigen.

use chrono::Utc;
use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{ChatBroadcast, ChatSendRequest, ServerMessage};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::membership::teilnehmer_ids;
use crate::server_state::SignalingState;

/// Maximale Laenge einer Chat-Nachricht in Zeichen
const NACHRICHT_MAX_LAENGE: usize = 4096;

/// Verarbeitet `chat-message`
pub fn handle_chat_send(
    request: ChatSendRequest,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    if request.message.trim().is_empty() {
        return Err(PalaverError::ungueltige_eingabe(
            "Nachricht darf nicht leer sein",
        ));
    }
    if request.message.chars().count() > NACHRICHT_MAX_LAENGE {
        return Err(PalaverError::ungueltige_eingabe(format!(
            "Nachricht darf hoechstens {} Zeichen lang sein",
            NACHRICHT_MAX_LAENGE
        )));
    }

    let handle = state
        .registry
        .raum(room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

    let raum = handle.lock();
    let user_name = match raum.finde(absender) {
        Some(teilnehmer) => teilnehmer.name.clone(),
        None => return Err(PalaverError::TeilnehmerNichtGefunden(absender.to_string())),
    };
    state.broadcaster.an_raum_senden(
        &teilnehmer_ids(raum.teilnehmer()),
        ServerMessage::ChatMessage(ChatBroadcast {
            id: Uuid::new_v4(),
            user_id: absender,
            user_name,
            message: request.message,
            timestamp: Utc::now(),
        }),
    );

    tracing::debug!(user_id = %absender, room_id = %room_id, "Chat-Nachricht verteilt");
    Ok(None)
}
