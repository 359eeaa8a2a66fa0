//! palaver-signaling – WebSocket-Signaling und Raum-API
//!
//! Dieser Crate implementiert den Signaling-Service fuer Palaver. Er
//! traegt die REST-Routen fuer den Raum-Lebenszyklus, wertet WebSocket-
//! Verbindungen auf und reicht SDP-Angebote, Antworten und ICE-
//! Kandidaten zwischen den Teilnehmern eines Raums durch.
//!
//! ## Architektur
//!
//! ```text
//! HttpServer (axum)
//!     |
//!     +-- REST  /api/rooms/...   (erstellen, beitreten, abfragen, schliessen)
//!     +-- WS    /ws
//!             |
//!             v
//!     ClientSession (pro Verbindung ein Task)
//!         |  Lebenslauf: Verbunden -> Gebunden (join-room) -> Getrennt
//!         |
//!         v
//!     MessageDispatcher
//!         |
//!         +-- membership  (join-room, Verlassen, Raum schliessen)
//!         +-- relay       (offer, answer, ice-candidate)
//!         +-- media       (toggle-audio, toggle-video, toggle-screen-share)
//!         +-- moderation  (kick-participant)
//!         +-- chat        (chat-message)
//!
//! RoomRegistry    – autoritativer Raum- und Teilnehmer-Zustand
//! RoomBroadcaster – Ereignisse an gebundene Verbindungen senden
//! ```

pub mod broadcast;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod http;
pub mod rest;
pub mod server_state;
pub mod session;

// Bequeme Re-Exporte
pub use broadcast::RoomBroadcaster;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use http::HttpServer;
pub use server_state::{SignalingConfig, SignalingState};
pub use session::ClientSession;
