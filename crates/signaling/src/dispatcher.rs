//! Message-Dispatcher – Routet Client-Nachrichten an die Handler
//!
//! Der Dispatcher bekommt geparste ClientMessages von einer
//! ClientSession, prueft den Bindungszustand und gibt die direkte
//! Antwort zurueck. Ereignisse an andere Teilnehmer laufen nicht hier
//! durch, die verschicken die Handler selbst ueber den Broadcaster.
//!
//! ## Zustandspruefung
//! - `join-room` nur solange die Verbindung ungebunden ist
//! - Alle anderen Nachrichten erst nach erfolgreichem `join-room`

use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use palaver_protocol::control::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::handlers::{chat, media, membership, moderation, relay};
use crate::server_state::SignalingState;

/// Session-Kontext – Zustand einer einzelnen Verbindung
pub struct SessionContext {
    /// Peer-Adresse fuer Logging
    pub peer_addr: SocketAddr,
    /// Raum und Teilnehmer-ID nach erfolgreichem `join-room`
    pub bindung: Option<(RoomId, ParticipantId)>,
    /// Beim Binden registrierte Empfangs-Queue, die Session holt sie
    /// nach dem Dispatch ab und liest daraus bis zum Verbindungsende
    pub empfangs_queue: Option<mpsc::Receiver<ServerMessage>>,
}

impl SessionContext {
    /// Erstellt einen Kontext fuer eine frische, ungebundene Verbindung
    pub fn neu(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            bindung: None,
            empfangs_queue: None,
        }
    }
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ClientMessages an die entsprechenden Handler und
/// gibt die direkte Antwort zurueck.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ClientMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort faellig ist.
    /// Fachliche Fehler kommen als `error`-Ereignis zurueck, die
    /// Verbindung bleibt dabei offen.
    pub fn dispatch(
        &self,
        nachricht: ClientMessage,
        ctx: &mut SessionContext,
    ) -> Option<ServerMessage> {
        match self.verarbeiten(nachricht, ctx) {
            Ok(antwort) => antwort,
            Err(e) => {
                tracing::debug!(peer = %ctx.peer_addr, fehler = %e, "Nachricht abgelehnt");
                Some(ServerMessage::error(e.to_string()))
            }
        }
    }

    fn verarbeiten(
        &self,
        nachricht: ClientMessage,
        ctx: &mut SessionContext,
    ) -> Result<Option<ServerMessage>> {
        match nachricht {
            // -----------------------------------------------------------------
            // Bindung (im ungebundenen Zustand erlaubt)
            // -----------------------------------------------------------------
            ClientMessage::JoinRoom(req) => membership::handle_join_room(req, ctx, &self.state),

            // -----------------------------------------------------------------
            // Verbindungsaufbau zwischen Teilnehmern
            // -----------------------------------------------------------------
            ClientMessage::Offer(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                relay::handle_offer(req, absender, room_id, &self.state)
            }
            ClientMessage::Answer(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                relay::handle_answer(req, absender, room_id, &self.state)
            }
            ClientMessage::IceCandidate(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                relay::handle_ice_candidate(req, absender, room_id, &self.state)
            }

            // -----------------------------------------------------------------
            // Medienzustand
            // -----------------------------------------------------------------
            ClientMessage::ToggleAudio(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                media::handle_toggle_audio(req, absender, room_id, &self.state)
            }
            ClientMessage::ToggleVideo(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                media::handle_toggle_video(req, absender, room_id, &self.state)
            }
            ClientMessage::ToggleScreenShare(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                media::handle_toggle_screen_share(req, absender, room_id, &self.state)
            }

            // -----------------------------------------------------------------
            // Moderation
            // -----------------------------------------------------------------
            ClientMessage::KickParticipant(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                moderation::handle_kick(req, absender, room_id, &self.state)
            }

            // -----------------------------------------------------------------
            // Chat
            // -----------------------------------------------------------------
            ClientMessage::ChatMessage(req) => {
                let (room_id, absender) = Self::bindung_pruefen(ctx)?;
                chat::handle_chat_send(req, absender, room_id, &self.state)
            }
        }
    }

    /// Raum und Teilnehmer-ID der gebundenen Verbindung
    fn bindung_pruefen(ctx: &SessionContext) -> Result<(RoomId, ParticipantId)> {
        ctx.bindung.ok_or_else(|| {
            PalaverError::NichtBerechtigt(
                "Nicht an einen Raum gebunden, zuerst join-room senden".into(),
            )
        })
    }

    /// Raeumt die Bindung einer Session beim Verbindungsende auf
    ///
    /// Ungebundene Sessions haben nichts zu bereinigen.
    pub fn session_cleanup(&self, ctx: &SessionContext) {
        if let Some((room_id, user_id)) = ctx.bindung {
            membership::verbindung_aufraeumen(room_id, user_id, &self.state);
            tracing::debug!(
                peer = %ctx.peer_addr,
                user_id = %user_id,
                "Session-Ressourcen bereinigt"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::test_state;
    use palaver_protocol::control::{
        ChatSendRequest, JoinRoomRequest, KickParticipantRequest, OfferRelay, ToggleAudioRequest,
        ToggleScreenShareRequest,
    };
    use serde_json::json;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    /// Bindet eine Verbindung per join-room und gibt Kontext + Queue zurueck
    fn binden(
        dispatcher: &MessageDispatcher,
        room_id: RoomId,
        user_id: ParticipantId,
    ) -> (SessionContext, mpsc::Receiver<ServerMessage>) {
        let mut ctx = SessionContext::neu(test_addr());
        let antwort = dispatcher.dispatch(
            ClientMessage::JoinRoom(JoinRoomRequest { room_id, user_id }),
            &mut ctx,
        );
        match antwort {
            Some(ServerMessage::RoomParticipants(_)) => {}
            andere => panic!("RoomParticipants erwartet, bekam {:?}", andere),
        }
        let queue = ctx
            .empfangs_queue
            .take()
            .expect("Queue muss nach dem Binden vorhanden sein");
        (ctx, queue)
    }

    #[tokio::test]
    async fn join_bindet_und_liefert_roster() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let mut ctx = SessionContext::neu(test_addr());
        let antwort = dispatcher.dispatch(
            ClientMessage::JoinRoom(JoinRoomRequest {
                room_id,
                user_id: ben.id,
            }),
            &mut ctx,
        );

        let roster = match antwort {
            Some(ServerMessage::RoomParticipants(ev)) => ev.participants,
            andere => panic!("RoomParticipants erwartet, bekam {:?}", andere),
        };
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().any(|p| p.id == host_id && p.is_host));
        assert!(roster.iter().any(|p| p.id == ben.id && !p.is_host));
        assert_eq!(ctx.bindung, Some((room_id, ben.id)));
        assert!(ctx.empfangs_queue.is_some());
    }

    #[tokio::test]
    async fn user_joined_geht_an_bereits_gebundene() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (_host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (_ben_ctx, _ben_rx) = binden(&dispatcher, room_id, ben.id);

        let ereignis = host_rx.try_recv().expect("Host muss user-joined sehen");
        match ereignis {
            ServerMessage::UserJoined(ev) => {
                assert_eq!(ev.participant.id, ben.id);
                assert_eq!(ev.participant.name, "Ben");
            }
            andere => panic!("UserJoined erwartet, bekam {:?}", andere),
        }
    }

    #[tokio::test]
    async fn doppelte_bindung_wird_abgelehnt() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();

        let (mut host_ctx, _host_rx) = binden(&dispatcher, room_id, host_id);

        // Dieselbe Verbindung nochmal
        let antwort = dispatcher.dispatch(
            ClientMessage::JoinRoom(JoinRoomRequest {
                room_id,
                user_id: host_id,
            }),
            &mut host_ctx,
        );
        assert!(matches!(antwort, Some(ServerMessage::Error(_))));

        // Eine zweite Verbindung auf dieselbe Teilnehmer-ID
        let mut fremd_ctx = SessionContext::neu(test_addr());
        let antwort = dispatcher.dispatch(
            ClientMessage::JoinRoom(JoinRoomRequest {
                room_id,
                user_id: host_id,
            }),
            &mut fremd_ctx,
        );
        assert!(matches!(antwort, Some(ServerMessage::Error(_))));
        assert!(fremd_ctx.bindung.is_none());
    }

    #[tokio::test]
    async fn ungebundene_verbindung_wird_abgewiesen() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state);

        let mut ctx = SessionContext::neu(test_addr());
        let antwort = dispatcher.dispatch(
            ClientMessage::ToggleAudio(ToggleAudioRequest {
                is_audio_muted: true,
            }),
            &mut ctx,
        );

        match antwort {
            Some(ServerMessage::Error(ev)) => {
                assert!(ev.message.contains("join-room"), "Hinweis fehlt: {}", ev.message)
            }
            andere => panic!("Error erwartet, bekam {:?}", andere),
        }
    }

    #[tokio::test]
    async fn offer_wird_mit_absender_gestempelt() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (mut host_ctx, _host_rx) = binden(&dispatcher, room_id, host_id);
        let (_ben_ctx, mut ben_rx) = binden(&dispatcher, room_id, ben.id);

        let blob = json!({"type": "offer", "sdp": "v=0\r\no=- 1 1 IN IP4 0.0.0.0"});
        let antwort = dispatcher.dispatch(
            ClientMessage::Offer(OfferRelay {
                target: ben.id,
                offer: blob.clone(),
            }),
            &mut host_ctx,
        );
        assert!(antwort.is_none(), "Relay hat keine direkte Antwort");

        match ben_rx.try_recv().expect("Ben muss das Offer bekommen") {
            ServerMessage::Offer(ev) => {
                assert_eq!(ev.sender, host_id, "target wird durch Absender ersetzt");
                assert_eq!(ev.offer, blob, "Blob bleibt unveraendert");
            }
            andere => panic!("Offer erwartet, bekam {:?}", andere),
        }
    }

    #[tokio::test]
    async fn relay_an_fremde_id_wird_abgewiesen() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();

        let (mut host_ctx, _host_rx) = binden(&dispatcher, room_id, host_id);

        let antwort = dispatcher.dispatch(
            ClientMessage::Offer(OfferRelay {
                target: ParticipantId::new(),
                offer: json!({"type": "offer"}),
            }),
            &mut host_ctx,
        );
        assert!(matches!(antwort, Some(ServerMessage::Error(_))));
    }

    #[tokio::test]
    async fn toggle_erreicht_alle_ausser_ausloeser() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();
        let clara = state.registry.raum_beitreten(room_id, "Clara").unwrap();

        let (_host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (mut ben_ctx, mut ben_rx) = binden(&dispatcher, room_id, ben.id);
        let (_clara_ctx, mut clara_rx) = binden(&dispatcher, room_id, clara.id);

        // user-joined Ereignisse der Beitritte abraeumen
        while host_rx.try_recv().is_ok() {}
        while ben_rx.try_recv().is_ok() {}

        let antwort = dispatcher.dispatch(
            ClientMessage::ToggleAudio(ToggleAudioRequest {
                is_audio_muted: true,
            }),
            &mut ben_ctx,
        );
        assert!(antwort.is_none());

        for rx in [&mut host_rx, &mut clara_rx] {
            match rx.try_recv().expect("Mitglieder muessen den Toggle sehen") {
                ServerMessage::ParticipantAudioToggle(ev) => {
                    assert_eq!(ev.user_id, ben.id);
                    assert!(ev.is_audio_muted);
                }
                andere => panic!("ParticipantAudioToggle erwartet, bekam {:?}", andere),
            }
        }
        assert!(ben_rx.try_recv().is_err(), "Ausloeser bekommt kein Echo");

        // Der neue Zustand steht im Roster fuer spaetere Beitritte
        let info = state.registry.raum_info(room_id).unwrap();
        let ben_info = info.teilnehmer.iter().find(|t| t.id == ben.id).unwrap();
        assert!(ben_info.is_audio_muted);
    }

    #[tokio::test]
    async fn screen_share_toggle_folgt_derselben_regel() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (_host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (mut ben_ctx, mut ben_rx) = binden(&dispatcher, room_id, ben.id);
        while host_rx.try_recv().is_ok() {}

        let antwort = dispatcher.dispatch(
            ClientMessage::ToggleScreenShare(ToggleScreenShareRequest {
                is_screen_sharing: true,
            }),
            &mut ben_ctx,
        );
        assert!(antwort.is_none());

        match host_rx.try_recv().expect("Host muss den Toggle sehen") {
            ServerMessage::ParticipantScreenShareToggle(ev) => {
                assert_eq!(ev.user_id, ben.id);
                assert!(ev.is_screen_sharing);
            }
            andere => panic!("ParticipantScreenShareToggle erwartet, bekam {:?}", andere),
        }
        assert!(ben_rx.try_recv().is_err(), "Ausloeser bekommt kein Echo");

        let info = state.registry.raum_info(room_id).unwrap();
        let ben_info = info.teilnehmer.iter().find(|t| t.id == ben.id).unwrap();
        assert!(ben_info.is_screen_sharing);
    }

    #[tokio::test]
    async fn kick_liefert_erst_kicked_dann_queue_ende() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (mut host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (_ben_ctx, mut ben_rx) = binden(&dispatcher, room_id, ben.id);
        while host_rx.try_recv().is_ok() {}

        let antwort = dispatcher.dispatch(
            ClientMessage::KickParticipant(KickParticipantRequest {
                user_id: ben.id,
                reason: None,
            }),
            &mut host_ctx,
        );
        assert!(antwort.is_none());

        // Der Gekickte sieht zuerst sein kicked, danach ist die Queue zu
        match ben_rx.recv().await.expect("kicked muss ankommen") {
            ServerMessage::Kicked(ev) => assert_eq!(ev.reason, "Vom Host entfernt"),
            andere => panic!("Kicked erwartet, bekam {:?}", andere),
        }
        assert!(ben_rx.recv().await.is_none(), "Queue muss geschlossen sein");

        // Die Verbleibenden sehen participant-kicked
        match host_rx.try_recv().expect("Host muss participant-kicked sehen") {
            ServerMessage::ParticipantKicked(ev) => assert_eq!(ev.user_id, ben.id),
            andere => panic!("ParticipantKicked erwartet, bekam {:?}", andere),
        }

        let info = state.registry.raum_info(room_id).unwrap();
        assert_eq!(info.teilnehmer.len(), 1);
    }

    #[tokio::test]
    async fn kick_nur_fuer_den_host() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (_host_ctx, _host_rx) = binden(&dispatcher, room_id, host_id);
        let (mut ben_ctx, _ben_rx) = binden(&dispatcher, room_id, ben.id);

        let antwort = dispatcher.dispatch(
            ClientMessage::KickParticipant(KickParticipantRequest {
                user_id: host_id,
                reason: None,
            }),
            &mut ben_ctx,
        );
        assert!(matches!(antwort, Some(ServerMessage::Error(_))));

        let info = state.registry.raum_info(room_id).unwrap();
        assert_eq!(info.teilnehmer.len(), 2, "Niemand wurde entfernt");
    }

    #[tokio::test]
    async fn chat_geht_an_alle_inklusive_absender() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (_host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (mut ben_ctx, mut ben_rx) = binden(&dispatcher, room_id, ben.id);
        while host_rx.try_recv().is_ok() {}

        let antwort = dispatcher.dispatch(
            ClientMessage::ChatMessage(ChatSendRequest {
                message: "Hallo zusammen".to_string(),
            }),
            &mut ben_ctx,
        );
        assert!(antwort.is_none());

        for rx in [&mut host_rx, &mut ben_rx] {
            match rx.try_recv().expect("Chat muss alle erreichen") {
                ServerMessage::ChatMessage(ev) => {
                    assert_eq!(ev.user_id, ben.id);
                    assert_eq!(ev.user_name, "Ben");
                    assert_eq!(ev.message, "Hallo zusammen");
                }
                andere => panic!("ChatMessage erwartet, bekam {:?}", andere),
            }
        }
    }

    #[tokio::test]
    async fn leere_chat_nachricht_wird_abgelehnt() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();

        let (mut host_ctx, _host_rx) = binden(&dispatcher, room_id, host_id);

        let antwort = dispatcher.dispatch(
            ClientMessage::ChatMessage(ChatSendRequest {
                message: "   ".to_string(),
            }),
            &mut host_ctx,
        );
        assert!(matches!(antwort, Some(ServerMessage::Error(_))));
    }

    #[tokio::test]
    async fn szenario_verlassen_mit_host_uebergabe() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, alice_id) = state.registry.raum_erstellen("Alice").unwrap();
        let bob = state.registry.raum_beitreten(room_id, "Bob").unwrap();

        let (alice_ctx, _alice_rx) = binden(&dispatcher, room_id, alice_id);
        let (bob_ctx, mut bob_rx) = binden(&dispatcher, room_id, bob.id);

        // Alice trennt die Verbindung: Bob sieht user-left + host-changed
        dispatcher.session_cleanup(&alice_ctx);
        match bob_rx.try_recv().expect("user-left muss ankommen") {
            ServerMessage::UserLeft(ev) => assert_eq!(ev.user_id, alice_id),
            andere => panic!("UserLeft erwartet, bekam {:?}", andere),
        }
        match bob_rx.try_recv().expect("host-changed muss ankommen") {
            ServerMessage::HostChanged(ev) => assert_eq!(ev.new_host_id, bob.id),
            andere => panic!("HostChanged erwartet, bekam {:?}", andere),
        }
        let info = state.registry.raum_info(room_id).unwrap();
        assert_eq!(info.teilnehmer.len(), 1);
        assert!(info.teilnehmer[0].is_host, "Bob ist jetzt Host");

        // Bob geht auch: der Raum verschwindet
        dispatcher.session_cleanup(&bob_ctx);
        assert!(state.registry.raum_info(room_id).is_err());
        assert_eq!(state.registry.anzahl_raeume(), 0);
        assert_eq!(state.broadcaster.client_anzahl(), 0);
    }

    #[tokio::test]
    async fn cleanup_nach_kick_ist_harmlos() {
        let state = test_state();
        let dispatcher = MessageDispatcher::neu(state.clone());
        let (room_id, host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();

        let (mut host_ctx, mut host_rx) = binden(&dispatcher, room_id, host_id);
        let (ben_ctx, _ben_rx) = binden(&dispatcher, room_id, ben.id);
        while host_rx.try_recv().is_ok() {}

        dispatcher.dispatch(
            ClientMessage::KickParticipant(KickParticipantRequest {
                user_id: ben.id,
                reason: Some("Stoerung".to_string()),
            }),
            &mut host_ctx,
        );
        while host_rx.try_recv().is_ok() {}

        // Bens Session-Ende nach dem Kick darf kein zweites user-left erzeugen
        dispatcher.session_cleanup(&ben_ctx);
        assert!(host_rx.try_recv().is_err());
        assert_eq!(state.registry.raum_info(room_id).unwrap().teilnehmer.len(), 1);
    }
}
