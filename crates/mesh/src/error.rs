//! Fehlertypen der Mesh-Schicht

use palaver_core::types::ParticipantId;
use thiserror::Error;

/// Fehler bei Verhandlung und Link-Verwaltung
#[derive(Debug, Error)]
pub enum MeshError {
    /// Der darunterliegende Transport hat einen Vorgang abgelehnt
    #[error("Transportfehler: {0}")]
    Transport(String),

    /// Der Transport kann die Video-Spur nicht im laufenden Betrieb ersetzen
    #[error("Spur-Ersatz nicht unterstuetzt")]
    SpurErsatzNichtUnterstuetzt,

    /// Ein gesendetes Angebot wurde nicht rechtzeitig beantwortet
    #[error("Verhandlung mit {0} abgelaufen")]
    VerhandlungAbgelaufen(ParticipantId),

    /// Fuer den Teilnehmer existiert kein Link
    #[error("Unbekannter Peer: {0}")]
    UnbekannterPeer(ParticipantId),

    /// Eine Nachricht passt nicht zum aktuellen Link-Zustand
    #[error("Ungueltiger Zustand: {0}")]
    UngueltigerZustand(String),
}

/// Ergebnis-Alias fuer Mesh-Operationen
pub type MeshResult<T> = Result<T, MeshError>;
