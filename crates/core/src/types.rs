//! Gemeinsame Identifikationstypen fuer Palaver
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Raum-IDs
//! sind gleichzeitig Bearer-Tokens: wer die ID kennt, darf beitreten.
//! UUIDv4 liefert dafuer genug Entropie.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Raum-ID (unerratbares Bearer-Token)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Erstellt eine neue zufaellige RoomId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Parst eine RoomId aus der String-Darstellung (z.B. URL-Pfad)
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

/// Eindeutige Teilnehmer-ID (stabil fuer die Lebensdauer der Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Erstellt eine neue zufaellige ParticipantId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Parst eine ParticipantId aus der String-Darstellung
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_eindeutig() {
        let a = RoomId::new();
        let b = RoomId::new();
        assert_ne!(a, b, "Zwei neue RoomIds muessen verschieden sein");
    }

    #[test]
    fn participant_id_eindeutig() {
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn room_id_display() {
        let id = RoomId(Uuid::nil());
        assert!(id.to_string().starts_with("room:"));
    }

    #[test]
    fn room_id_parse_roundtrip() {
        let id = RoomId::new();
        let geparst = RoomId::parse(&id.inner().to_string()).unwrap();
        assert_eq!(id, geparst);
    }

    #[test]
    fn room_id_parse_ungueltig() {
        assert!(RoomId::parse("kein-uuid").is_none());
        assert!(RoomId::parse("").is_none());
    }

    #[test]
    fn participant_ids_sind_geordnet() {
        // Die Initiator-Regel der Mesh-Verhandlung braucht eine totale Ordnung
        let mut ids: Vec<ParticipantId> = (0..4).map(|_| ParticipantId::new()).collect();
        ids.sort();
        for paar in ids.windows(2) {
            assert!(paar[0] <= paar[1]);
        }
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let id = ParticipantId::new();
        let json = serde_json::to_string(&id).unwrap();
        let id2: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, id2);
    }
}
