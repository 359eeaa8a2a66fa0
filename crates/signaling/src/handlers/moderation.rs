//! Moderations-Handler – Kick durch den Host
//!
//! Die Reihenfolge ist Teil des Protokolls: erst bekommt der Gekickte
//! sein `kicked` und seine Queue wird geschlossen, dann erfahren die
//! Verbleibenden per `participant-kicked` davon.

use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{
    KickParticipantRequest, KickedEvent, ParticipantKickedEvent, ServerMessage,
};
use std::sync::Arc;

use crate::handlers::membership::teilnehmer_ids;
use crate::server_state::SignalingState;

/// Verarbeitet `kick-participant`
pub fn handle_kick(
    request: KickParticipantRequest,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    let handle = state
        .registry
        .raum(room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

    let mut raum = handle.lock();
    if !raum.ist_host(absender) {
        return Err(PalaverError::NichtBerechtigt(
            "Nur der Host darf Teilnehmer entfernen".into(),
        ));
    }
    if request.user_id == absender {
        return Err(PalaverError::ungueltige_eingabe(
            "Der Host kann sich nicht selbst entfernen",
        ));
    }
    // Der Gekickte ist nie Host, Host-Uebergabe findet hier nicht statt
    if raum.entfernen(request.user_id).is_none() {
        return Err(PalaverError::TeilnehmerNichtGefunden(
            request.user_id.to_string(),
        ));
    }

    let grund = request
        .reason
        .unwrap_or_else(|| "Vom Host entfernt".to_string());
    state.broadcaster.an_user_senden(
        &request.user_id,
        ServerMessage::Kicked(KickedEvent { reason: grund }),
    );
    state.broadcaster.client_entfernen(&request.user_id);
    state.broadcaster.an_raum_senden(
        &teilnehmer_ids(raum.teilnehmer()),
        ServerMessage::ParticipantKicked(ParticipantKickedEvent {
            user_id: request.user_id,
        }),
    );

    tracing::info!(
        room_id = %room_id,
        host_id = %absender,
        user_id = %request.user_id,
        "Teilnehmer vom Host entfernt"
    );
    Ok(None)
}
