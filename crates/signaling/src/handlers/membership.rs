//! Membership-Handler – Binden, Verlassen, Raum schliessen
//!
//! Teilnehmer werden per REST in die Raumliste aufgenommen; hier wird
//! die WebSocket-Verbindung an die dabei vergebene ID gebunden und
//! spaeter wieder aufgeraeumt.

use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{
    HostChangedEvent, JoinRoomRequest, ParticipantInfo, RoomClosedEvent, RoomParticipantsEvent,
    ServerMessage, UserJoinedEvent, UserLeftEvent,
};
use palaver_rooms::Teilnehmer;
use std::sync::Arc;

use crate::dispatcher::SessionContext;
use crate::server_state::SignalingState;

/// Konvertiert Raum-Zustand in die Protokoll-Sicht eines Teilnehmers
pub(crate) fn teilnehmer_info(teilnehmer: &Teilnehmer) -> ParticipantInfo {
    ParticipantInfo {
        id: teilnehmer.id,
        name: teilnehmer.name.clone(),
        is_host: teilnehmer.is_host,
        is_audio_muted: teilnehmer.is_audio_muted,
        is_video_enabled: teilnehmer.is_video_enabled,
        is_screen_sharing: teilnehmer.is_screen_sharing,
    }
}

/// IDs aller Teilnehmer, als Empfaengerliste fuer den Broadcaster
pub(crate) fn teilnehmer_ids(teilnehmer: &[Teilnehmer]) -> Vec<ParticipantId> {
    teilnehmer.iter().map(|t| t.id).collect()
}

/// Verarbeitet `join-room`: bindet die Verbindung an ihre Teilnehmer-ID
///
/// Unter dem Raum-Lock wird die Send-Queue registriert und danach
/// `user-joined` an die uebrigen Mitglieder verteilt: sobald jemand den
/// Neuen sieht, ist der Neue auch erreichbar. Die Antwort an den
/// Absender ist der komplette Roster.
pub fn handle_join_room(
    request: JoinRoomRequest,
    ctx: &mut SessionContext,
    state: &Arc<SignalingState>,
) -> Result<Option<ServerMessage>> {
    if ctx.bindung.is_some() {
        return Err(PalaverError::NichtBerechtigt(
            "Verbindung ist bereits an einen Raum gebunden".into(),
        ));
    }

    let handle = state
        .registry
        .raum(request.room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(request.room_id.to_string()))?;

    let raum = handle.lock();
    if raum.ist_geschlossen() {
        return Err(PalaverError::RaumNichtGefunden(request.room_id.to_string()));
    }
    let teilnehmer = raum
        .finde(request.user_id)
        .ok_or_else(|| PalaverError::TeilnehmerNichtGefunden(request.user_id.to_string()))?;
    if state.broadcaster.ist_registriert(&request.user_id) {
        return Err(PalaverError::NichtBerechtigt(
            "Teilnehmer-ID ist bereits an eine Verbindung gebunden".into(),
        ));
    }

    let queue = state.broadcaster.client_registrieren(request.user_id);
    state.broadcaster.an_raum_ausser_senden(
        &teilnehmer_ids(raum.teilnehmer()),
        &request.user_id,
        ServerMessage::UserJoined(UserJoinedEvent {
            participant: teilnehmer_info(teilnehmer),
        }),
    );
    let roster: Vec<ParticipantInfo> = raum.teilnehmer().iter().map(teilnehmer_info).collect();
    drop(raum);

    ctx.bindung = Some((request.room_id, request.user_id));
    ctx.empfangs_queue = Some(queue);

    tracing::info!(
        room_id = %request.room_id,
        user_id = %request.user_id,
        "Verbindung an Raum gebunden"
    );

    Ok(Some(ServerMessage::RoomParticipants(
        RoomParticipantsEvent {
            participants: roster,
        },
    )))
}

/// Loest die Bindung einer Verbindung auf und raeumt nach
///
/// Idempotent: laufen Session-Ende und Kick gleichzeitig hier hinein,
/// gewinnt der Erste; fuer den Zweiten ist der Teilnehmer schon aus dem
/// Raum und es passiert nichts mehr. Die Verbleibenden bekommen
/// `user-left` und bei Host-Uebergabe `host-changed`; der letzte
/// Teilnehmer nimmt den Raum mit.
pub fn verbindung_aufraeumen(
    room_id: RoomId,
    user_id: ParticipantId,
    state: &Arc<SignalingState>,
) {
    state.broadcaster.client_entfernen(&user_id);

    let handle = match state.registry.raum(room_id) {
        Some(handle) => handle,
        None => return,
    };
    let mut raum = handle.lock();
    if raum.ist_geschlossen() {
        return;
    }
    let ergebnis = match raum.entfernen(user_id) {
        Some(ergebnis) => ergebnis,
        None => return,
    };

    let verbleibende = teilnehmer_ids(raum.teilnehmer());
    state
        .broadcaster
        .an_raum_senden(&verbleibende, ServerMessage::UserLeft(UserLeftEvent { user_id }));
    if let Some(neuer_host) = ergebnis.neuer_host {
        tracing::info!(room_id = %room_id, neuer_host = %neuer_host, "Host-Rolle uebergeben");
        state.broadcaster.an_raum_senden(
            &verbleibende,
            ServerMessage::HostChanged(HostChangedEvent {
                new_host_id: neuer_host,
            }),
        );
    }

    if ergebnis.raum_leer {
        raum.schliessen();
        drop(raum);
        state.registry.raum_austragen(room_id);
    }

    tracing::info!(room_id = %room_id, user_id = %user_id, "Teilnehmer hat den Raum verlassen");
}

/// Schliesst einen Raum auf Anforderung des Hosts
///
/// Alle Mitglieder bekommen `room-closed`, danach verschwindet der Raum
/// aus der Registry und die Queues aller Mitglieder werden geschlossen.
pub fn raum_schliessen(
    room_id: RoomId,
    anforderer: ParticipantId,
    state: &Arc<SignalingState>,
) -> Result<()> {
    let handle = state
        .registry
        .raum(room_id)
        .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

    let mut raum = handle.lock();
    if raum.ist_geschlossen() {
        return Err(PalaverError::RaumNichtGefunden(room_id.to_string()));
    }
    if !raum.enthaelt(anforderer) {
        return Err(PalaverError::TeilnehmerNichtGefunden(anforderer.to_string()));
    }
    if !raum.ist_host(anforderer) {
        return Err(PalaverError::NichtBerechtigt(
            "Nur der Host darf den Raum schliessen".into(),
        ));
    }

    raum.schliessen();
    let mitglieder = teilnehmer_ids(raum.teilnehmer());
    state.broadcaster.an_raum_senden(
        &mitglieder,
        ServerMessage::RoomClosed(RoomClosedEvent {
            reason: "Der Host hat den Raum geschlossen".to_string(),
        }),
    );
    drop(raum);

    state.registry.raum_austragen(room_id);
    for user_id in &mitglieder {
        state.broadcaster.client_entfernen(user_id);
    }

    tracing::info!(room_id = %room_id, host_id = %anforderer, "Raum vom Host geschlossen");
    Ok(())
}
