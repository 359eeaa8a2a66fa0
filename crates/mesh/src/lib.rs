//! palaver-mesh – Peer-Link-Koordinator
//!
//! Verwaltet die Vollvermaschung einer Raum-Sitzung auf Teilnehmer-Seite:
//! pro entferntem Peer ein Verhandlungskontext mit Zustandsmaschine,
//! deterministischer Initiator-Wahl und Kandidaten-Pufferung. Die
//! Medien-Engine selbst steckt hinter den Transport-Traits; GUI-, CLI-
//! und Test-Harnische liefern eigene Implementierungen und treiben
//! denselben Kern.
//!
//! ## Module
//! - [`coordinator`] – [`MeshCoordinator`] und [`MeshEvent`]
//! - [`link`] – Zustandsmaschine pro Peer
//! - [`transport`] – [`PeerTransport`] / [`TransportFactory`]
//! - [`error`] – Fehlertypen

pub mod coordinator;
pub mod error;
pub mod link;
pub mod transport;

pub use coordinator::{MeshCoordinator, MeshEvent, STANDARD_VERHANDLUNGS_TIMEOUT};
pub use error::{MeshError, MeshResult};
pub use link::LinkZustand;
pub use transport::{PeerTransport, TransportFactory};
