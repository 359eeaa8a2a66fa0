//! Raum-Registry – Verwaltet alle aktiven Raeume
//!
//! Jeder Raum haengt hinter einem eigenen Mutex: Mutationen an einem
//! Raum laufen strikt nacheinander, verschiedene Raeume blockieren
//! sich nicht. Die Registry selbst redet nie mit dem Netz; welche
//! Ereignisse nach einer Mutation verschickt werden entscheidet die
//! Signaling-Schicht, die dafuer den Raum-Mutex haelt.

use dashmap::DashMap;
use palaver_core::error::{PalaverError, Result};
use palaver_core::types::{ParticipantId, RoomId};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::raum::{Raum, Teilnehmer};

/// Maximale Laenge eines Anzeigenamens
const NAME_MAX_LAENGE: usize = 64;

/// Lock-Handle auf einen einzelnen Raum
pub type RaumHandle = Arc<Mutex<Raum>>;

/// Read-only Abbild eines Raums fuer Abfragen
#[derive(Debug, Clone)]
pub struct RaumSchnappschuss {
    pub id: RoomId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub teilnehmer: Vec<Teilnehmer>,
}

/// Verwaltet alle aktiven Raeume
///
/// Thread-safe via Arc + DashMap. Clone der Registry teilt den inneren Zustand.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RoomRegistryInner>,
}

struct RoomRegistryInner {
    /// Alle Raeume, jeder hinter seinem eigenen Lock
    raeume: DashMap<RoomId, Arc<Mutex<Raum>>>,
    /// Obergrenze pro Raum, 0 = unbegrenzt
    max_teilnehmer_pro_raum: usize,
}

impl RoomRegistry {
    /// Erstellt eine neue Registry
    pub fn neu(max_teilnehmer_pro_raum: usize) -> Self {
        Self {
            inner: Arc::new(RoomRegistryInner {
                raeume: DashMap::new(),
                max_teilnehmer_pro_raum,
            }),
        }
    }

    /// Legt einen neuen Raum an, der Ersteller wird Host
    pub fn raum_erstellen(&self, host_name: &str) -> Result<(RoomId, ParticipantId)> {
        let name = Self::name_pruefen(host_name)?;
        let room_id = RoomId::new();
        let host = Teilnehmer::neu(name, true);
        let host_id = host.id;

        self.inner
            .raeume
            .insert(room_id, Arc::new(Mutex::new(Raum::neu(room_id, host))));

        tracing::info!(room_id = %room_id, host_id = %host_id, "Raum erstellt");
        Ok((room_id, host_id))
    }

    /// Fuegt dem Raum einen neuen Teilnehmer hinzu
    ///
    /// Der Teilnehmer ist danach Teil der Raumliste, seine Verbindung
    /// bindet sich erst spaeter per `join-room` an die vergebene ID.
    pub fn raum_beitreten(&self, room_id: RoomId, user_name: &str) -> Result<Teilnehmer> {
        let name = Self::name_pruefen(user_name)?;
        let handle = self
            .raum(room_id)
            .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

        let mut raum = handle.lock();
        if raum.ist_geschlossen() {
            // Der Raum haengt nur noch an alten Referenzen
            return Err(PalaverError::RaumNichtGefunden(room_id.to_string()));
        }

        let max = self.inner.max_teilnehmer_pro_raum;
        if max > 0 && raum.anzahl() >= max {
            return Err(PalaverError::ungueltige_eingabe(format!(
                "Raum ist voll (maximal {} Teilnehmer)",
                max
            )));
        }

        let teilnehmer = Teilnehmer::neu(name, false);
        raum.beitreten(teilnehmer.clone());

        tracing::info!(room_id = %room_id, user_id = %teilnehmer.id, "Teilnehmer beigetreten");
        Ok(teilnehmer)
    }

    /// Gibt ein read-only Abbild des Raums zurueck
    pub fn raum_info(&self, room_id: RoomId) -> Result<RaumSchnappschuss> {
        let handle = self
            .raum(room_id)
            .ok_or_else(|| PalaverError::RaumNichtGefunden(room_id.to_string()))?;

        let raum = handle.lock();
        if raum.ist_geschlossen() {
            return Err(PalaverError::RaumNichtGefunden(room_id.to_string()));
        }
        Ok(RaumSchnappschuss {
            id: raum.id,
            created_at: raum.created_at,
            teilnehmer: raum.teilnehmer().to_vec(),
        })
    }

    /// Gibt das Lock-Handle eines Raums zurueck
    ///
    /// Die Signaling-Schicht haelt das Lock ueber Mutation und Fanout
    /// hinweg, damit kein anderer Handler dazwischen funkt.
    pub fn raum(&self, room_id: RoomId) -> Option<RaumHandle> {
        self.inner.raeume.get(&room_id).map(|e| e.value().clone())
    }

    /// Entfernt einen Raum aus dem Index
    ///
    /// Der Aufrufer hat den Raum vorher unter dessen eigenem Lock als
    /// geschlossen markiert, damit parallele Beitritte ueber eine alte
    /// Referenz ins Leere laufen.
    pub fn raum_austragen(&self, room_id: RoomId) {
        if self.inner.raeume.remove(&room_id).is_some() {
            tracing::info!(room_id = %room_id, "Raum ausgetragen");
        }
    }

    /// Anzahl der aktiven Raeume
    pub fn anzahl_raeume(&self) -> usize {
        self.inner.raeume.len()
    }

    /// Summe der Teilnehmer ueber alle Raeume
    pub fn anzahl_teilnehmer(&self) -> usize {
        self.inner
            .raeume
            .iter()
            .map(|e| e.value().lock().anzahl())
            .sum()
    }

    fn name_pruefen(name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PalaverError::ungueltige_eingabe(
                "Name darf nicht leer sein",
            ));
        }
        if name.chars().count() > NAME_MAX_LAENGE {
            return Err(PalaverError::ungueltige_eingabe(format!(
                "Name darf hoechstens {} Zeichen lang sein",
                NAME_MAX_LAENGE
            )));
        }
        Ok(name.to_string())
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::neu(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
