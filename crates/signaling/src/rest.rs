//! REST-Handler fuer den Raum-Lebenszyklus
//!
//! Raeume werden per REST angelegt, betreten, abgefragt und
//! geschlossen; das Live-Signaling laeuft danach ueber den WebSocket.
//! Wer die Raum-ID kennt darf beitreten, eine weitere Autorisierung
//! gibt es nicht.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use palaver_core::error::PalaverError;
use palaver_core::types::RoomId;
use palaver_protocol::rest::{
    CreateRoomRequest, CreateRoomResponse, RoomDeleteRequest, RoomInfo, RoomInfoResponse,
    RoomJoinRequest, RoomJoinResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::membership;
use crate::server_state::SignalingState;

/// POST /api/rooms/create – Raum anlegen, der Ersteller wird Host
pub async fn raum_erstellen(
    State(state): State<Arc<SignalingState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Response {
    match state.registry.raum_erstellen(&body.host_name) {
        Ok((room_id, host_id)) => (
            StatusCode::OK,
            Json(CreateRoomResponse {
                success: true,
                room_id,
                host_id,
            }),
        )
            .into_response(),
        Err(e) => fehler_antwort(&e),
    }
}

/// POST /api/rooms/:room_id/join – Teilnehmer in die Raumliste aufnehmen
///
/// Die vergebene Teilnehmer-ID bindet der Client anschliessend per
/// `join-room` auf dem WebSocket.
pub async fn raum_beitreten(
    State(state): State<Arc<SignalingState>>,
    Path(room_id): Path<Uuid>,
    Json(body): Json<RoomJoinRequest>,
) -> Response {
    match state
        .registry
        .raum_beitreten(RoomId(room_id), &body.user_name)
    {
        Ok(teilnehmer) => (
            StatusCode::OK,
            Json(RoomJoinResponse {
                success: true,
                user_id: teilnehmer.id,
            }),
        )
            .into_response(),
        Err(e) => fehler_antwort(&e),
    }
}

/// GET /api/rooms/:room_id – Raum-Metadaten und Teilnehmerliste
pub async fn raum_info(
    State(state): State<Arc<SignalingState>>,
    Path(room_id): Path<Uuid>,
) -> Response {
    match state.registry.raum_info(RoomId(room_id)) {
        Ok(schnappschuss) => (
            StatusCode::OK,
            Json(RoomInfoResponse {
                success: true,
                room: RoomInfo {
                    room_id: schnappschuss.id,
                    created_at: schnappschuss.created_at,
                    participants: schnappschuss
                        .teilnehmer
                        .iter()
                        .map(membership::teilnehmer_info)
                        .collect(),
                },
            }),
        )
            .into_response(),
        Err(e) => fehler_antwort(&e),
    }
}

/// DELETE /api/rooms/:room_id – Raum schliessen (nur Host)
pub async fn raum_schliessen(
    State(state): State<Arc<SignalingState>>,
    Path(room_id): Path<Uuid>,
    Json(body): Json<RoomDeleteRequest>,
) -> Response {
    match membership::raum_schliessen(RoomId(room_id), body.user_id, &state) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => fehler_antwort(&e),
    }
}

/// Uebersetzt einen Fachfehler in Status plus JSON-Fehlerkoerper
fn fehler_antwort(fehler: &PalaverError) -> Response {
    let status = match fehler {
        PalaverError::UngueltigeEingabe(_) => StatusCode::BAD_REQUEST,
        PalaverError::RaumNichtGefunden(_) | PalaverError::TeilnehmerNichtGefunden(_) => {
            StatusCode::NOT_FOUND
        }
        PalaverError::NichtBerechtigt(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "success": false, "error": fehler.to_string() })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::test_state;
    use palaver_protocol::control::ServerMessage;

    /// Liest den JSON-Koerper einer Antwort aus
    async fn json_koerper<T: serde::de::DeserializeOwned>(antwort: Response) -> T {
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .expect("Koerper muss lesbar sein");
        serde_json::from_slice(&bytes).expect("Koerper muss gueltiges JSON sein")
    }

    #[test]
    fn fehlerstatus_zuordnung() {
        let faelle = [
            (
                PalaverError::ungueltige_eingabe("x"),
                StatusCode::BAD_REQUEST,
            ),
            (
                PalaverError::RaumNichtGefunden("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PalaverError::TeilnehmerNichtGefunden("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PalaverError::NichtBerechtigt("x".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                PalaverError::intern("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (fehler, erwartet) in faelle {
            assert_eq!(fehler_antwort(&fehler).status(), erwartet);
        }
    }

    #[tokio::test]
    async fn lebenszyklus_ueber_rest() {
        let state = test_state();

        let antwort = raum_erstellen(
            State(state.clone()),
            Json(CreateRoomRequest {
                host_name: "Anna".to_string(),
            }),
        )
        .await;
        assert_eq!(antwort.status(), StatusCode::OK);
        let erstellt: CreateRoomResponse = json_koerper(antwort).await;
        assert!(erstellt.success);

        let antwort = raum_beitreten(
            State(state.clone()),
            Path(erstellt.room_id.inner()),
            Json(RoomJoinRequest {
                user_name: "Ben".to_string(),
            }),
        )
        .await;
        assert_eq!(antwort.status(), StatusCode::OK);
        let beigetreten: RoomJoinResponse = json_koerper(antwort).await;
        assert!(beigetreten.success);

        let antwort = raum_info(State(state.clone()), Path(erstellt.room_id.inner())).await;
        assert_eq!(antwort.status(), StatusCode::OK);
        let info: RoomInfoResponse = json_koerper(antwort).await;
        assert_eq!(info.room.participants.len(), 2);
        assert!(info
            .room
            .participants
            .iter()
            .any(|p| p.id == erstellt.host_id && p.is_host));
        assert!(info
            .room
            .participants
            .iter()
            .any(|p| p.id == beigetreten.user_id && !p.is_host));
    }

    #[tokio::test]
    async fn leerer_name_ergibt_400() {
        let state = test_state();
        let antwort = raum_erstellen(
            State(state),
            Json(CreateRoomRequest {
                host_name: "  ".to_string(),
            }),
        )
        .await;
        assert_eq!(antwort.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unbekannter_raum_ergibt_404() {
        let state = test_state();
        let antwort = raum_info(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(antwort.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nur_der_host_darf_loeschen() {
        let state = test_state();
        let (room_id, _host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let antwort = raum_schliessen(
            State(state.clone()),
            Path(room_id.inner()),
            Json(RoomDeleteRequest { user_id: ben.id }),
        )
        .await;
        assert_eq!(antwort.status(), StatusCode::FORBIDDEN);
        assert!(
            state.registry.raum_info(room_id).is_ok(),
            "Raum besteht weiter"
        );
    }

    #[tokio::test]
    async fn host_loescht_raum_mit_room_closed() {
        let state = test_state();
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();
        let mut ben_rx = state.broadcaster.client_registrieren(ben.id);

        let antwort = raum_schliessen(
            State(state.clone()),
            Path(room_id.inner()),
            Json(RoomDeleteRequest { user_id: host_id }),
        )
        .await;
        assert_eq!(antwort.status(), StatusCode::OK);

        match ben_rx.recv().await.expect("room-closed muss ankommen") {
            ServerMessage::RoomClosed(ev) => {
                assert_eq!(ev.reason, "Der Host hat den Raum geschlossen")
            }
            andere => panic!("RoomClosed erwartet, bekam {:?}", andere),
        }
        assert!(ben_rx.recv().await.is_none(), "Queue muss geschlossen sein");
        assert!(state.registry.raum_info(room_id).is_err());
        assert_eq!(state.registry.anzahl_raeume(), 0);
    }
}
