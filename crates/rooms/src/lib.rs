//! palaver-rooms – Raum-Registry und Teilnehmer-Zustand
//!
//! Haelt den autoritativen Zustand aller Raeume: wer ist drin, wer ist
//! Host, welche Medien-Flags sind gesetzt. Reiner Zustand plus
//! Mutations-API; Netzwerk und Ereignisversand passieren eine Schicht
//! darueber.

pub mod raum;
pub mod registry;

pub use raum::{EntfernenErgebnis, MedienFlag, Raum, Teilnehmer};
pub use registry::{RaumHandle, RaumSchnappschuss, RoomRegistry};
