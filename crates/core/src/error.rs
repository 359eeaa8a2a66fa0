//! Fehlertypen fuer Palaver
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Palaver
pub type Result<T> = std::result::Result<T, PalaverError>;

/// Alle moeglichen Fehler im Palaver-System
#[derive(Debug, Error)]
pub enum PalaverError {
    // --- Eingabe-Validierung ---
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    // --- Ressourcen ---
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    #[error("Teilnehmer nicht gefunden: {0}")]
    TeilnehmerNichtGefunden(String),

    // --- Autorisierung ---
    #[error("Nicht berechtigt: {0}")]
    NichtBerechtigt(String),

    // --- Verbindung & Medien ---
    #[error("Transportfehler: {0}")]
    TransportFehler(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PalaverError {
    /// Erstellt einen Eingabe-Validierungsfehler
    pub fn ungueltige_eingabe(msg: impl Into<String>) -> Self {
        Self::UngueltigeEingabe(msg.into())
    }

    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::TransportFehler(_) | Self::Getrennt(_))
    }

    /// Gibt true zurueck wenn der Fehler keinen Zustand veraendert hat
    ///
    /// Validierungs-, Lookup- und Autorisierungsfehler werden abgelehnt
    /// bevor irgendeine Mutation stattfindet.
    pub fn ist_zustandslos(&self) -> bool {
        matches!(
            self,
            Self::UngueltigeEingabe(_)
                | Self::RaumNichtGefunden(_)
                | Self::TeilnehmerNichtGefunden(_)
                | Self::NichtBerechtigt(_)
        )
    }
}
