//! Relay-Handler – Offer, Answer, ICE-Candidate
//!
//! SDP- und Kandidaten-Blobs werden nicht interpretiert, nur an das
//! Ziel durchgereicht. Der Server ersetzt dabei `target` durch den
//! Absender, damit der Empfaenger weiss von wem das Signal stammt.

use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{
    AnswerEvent, AnswerRelay, IceCandidateEvent, IceCandidateRelay, OfferEvent, OfferRelay,
    ServerMessage,
};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet `offer`: SDP-Angebot an das Ziel weiterreichen
pub fn handle_offer(
    request: OfferRelay,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    let ziel = request.target;
    weiterleiten(
        ziel,
        absender,
        room_id,
        state,
        ServerMessage::Offer(OfferEvent {
            sender: absender,
            offer: request.offer,
        }),
    )
}

/// Verarbeitet `answer`: SDP-Antwort an das Ziel weiterreichen
pub fn handle_answer(
    request: AnswerRelay,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    let ziel = request.target;
    weiterleiten(
        ziel,
        absender,
        room_id,
        state,
        ServerMessage::Answer(AnswerEvent {
            sender: absender,
            answer: request.answer,
        }),
    )
}

/// Verarbeitet `ice-candidate`: Kandidat an das Ziel weiterreichen
pub fn handle_ice_candidate(
    request: IceCandidateRelay,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    let ziel = request.target;
    weiterleiten(
        ziel,
        absender,
        room_id,
        state,
        ServerMessage::IceCandidate(IceCandidateEvent {
            sender: absender,
            candidate: request.candidate,
        }),
    )
}

/// Prueft die Ziel-Mitgliedschaft unter dem Raum-Lock und stellt zu
fn weiterleiten(
    ziel: ParticipantId,
    absender: ParticipantId,
    room_id: RoomId,
    state: &Arc<SignalingState>,
    ereignis: ServerMessage,
) -> Result<Option<ServerMessage>> {
    let handle = state
        .registry
        .raum(room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

    let raum = handle.lock();
    if !raum.enthaelt(ziel) {
        return Err(PalaverError::NichtBerechtigt(
            "Ziel ist nicht im selben Raum".into(),
        ));
    }
    state.broadcaster.an_user_senden(&ziel, ereignis);

    tracing::debug!(von = %absender, an = %ziel, room_id = %room_id, "Signal weitergereicht");
    Ok(None)
}
