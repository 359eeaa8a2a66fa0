//! Handler fuer alle Client-Nachrichten
//!
//! Jeder Handler ist fuer eine Nachrichtengruppe zustaendig und hat
//! Zugriff auf den gemeinsamen SignalingState. Handler die den Raum
//! veraendern halten dessen Lock ueber Mutation und Fanout hinweg.

pub mod chat;
pub mod media;
pub mod membership;
pub mod moderation;
pub mod relay;
