//! Fehlertypen fuer den Signaling-Service

use palaver_core::error::PalaverError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Fehler beim Senden oder Empfangen
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] axum::Error),

    /// Nachricht liess sich nicht (de)serialisieren
    #[error("Serialisierungsfehler: {0}")]
    Serialisierung(#[from] serde_json::Error),

    /// Fachlicher Fehler aus Registry oder Handlern
    #[error(transparent)]
    Fachlich(#[from] PalaverError),
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
