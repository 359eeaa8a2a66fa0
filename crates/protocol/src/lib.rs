//! palaver-protocol – Protokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Client
//! und Server ausgetauscht werden: das WebSocket-Signalprotokoll und
//! die REST-Datentypen der Raum-Verwaltung.

pub mod control;
pub mod rest;

pub use control::{ClientMessage, ParticipantInfo, ServerMessage};
