//! Medien-Handler – Audio-, Video- und Bildschirm-Umschaltung
//!
//! Der neue Zustand wird im Raum gespeichert, damit spaete Beitritte
//! ihn ueber den Roster sehen, und an alle uebrigen Mitglieder
//! verteilt. Der Ausloeser kennt seinen Zustand selbst.

use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{
    AudioToggleEvent, ScreenShareToggleEvent, ServerMessage, ToggleAudioRequest,
    ToggleScreenShareRequest, ToggleVideoRequest, VideoToggleEvent,
};
use palaver_rooms::MedienFlag;
use std::sync::Arc;

use crate::handlers::membership::teilnehmer_ids;
use crate::server_state::SignalingState;

/// Verarbeitet `toggle-audio`
pub fn handle_toggle_audio(
    request: ToggleAudioRequest,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    flag_umschalten(
        absender,
        room_id,
        state,
        MedienFlag::AudioStumm,
        request.is_audio_muted,
        ServerMessage::ParticipantAudioToggle(AudioToggleEvent {
            user_id: absender,
            is_audio_muted: request.is_audio_muted,
        }),
    )
}

/// Verarbeitet `toggle-video`
pub fn handle_toggle_video(
    request: ToggleVideoRequest,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    flag_umschalten(
        absender,
        room_id,
        state,
        MedienFlag::VideoAktiv,
        request.is_video_enabled,
        ServerMessage::ParticipantVideoToggle(VideoToggleEvent {
            user_id: absender,
            is_video_enabled: request.is_video_enabled,
        }),
    )
}

/// Verarbeitet `toggle-screen-share`
pub fn handle_toggle_screen_share(
    request: ToggleScreenShareRequest,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    flag_umschalten(
        absender,
        room_id,
        state,
        MedienFlag::Bildschirm,
        request.is_screen_sharing,
        ServerMessage::ParticipantScreenShareToggle(ScreenShareToggleEvent {
            user_id: absender,
            is_screen_sharing: request.is_screen_sharing,
        }),
    )
}

/// Setzt das Flag unter dem Raum-Lock und verteilt das Ereignis
fn flag_umschalten(
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
    flag: MedienFlag,
    wert: bool,
    ereignis: ServerMessage,
) -> Result<Option<ServerMessage>> {
    let handle = state
        .registry
        .raum(room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

    let mut raum = handle.lock();
    match raum.finde_mut(absender) {
        Some(teilnehmer) => teilnehmer.flag_setzen(flag, wert),
        None => return Err(PalaverError::TeilnehmerNichtGefunden(absender.to_string())),
    }
    state
        .broadcaster
        .an_raum_ausser_senden(&teilnehmer_ids(raum.teilnehmer()), &absender, ereignis);

    tracing::debug!(user_id = %absender, room_id = %room_id, "Medien-Flag aktualisiert");
    Ok(None)
}
