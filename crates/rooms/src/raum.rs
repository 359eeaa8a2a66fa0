//! Raum-Datenmodell
//!
//! Ein Raum haelt seine Teilnehmer in Beitrittsreihenfolge. Solange der
//! Raum nicht leer ist traegt genau ein Teilnehmer die Host-Rolle;
//! verlaesst der Host den Raum, geht die Rolle an den am laengsten
//! anwesenden Teilnehmer ueber. Raeume leben nur im Speicher.

use chrono::{DateTime, Utc};
use palaver_core::types::{ParticipantId, RoomId};

// ---------------------------------------------------------------------------
// Teilnehmer
// ---------------------------------------------------------------------------

/// Medien-Flags die ein Teilnehmer selbst umschalten kann
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedienFlag {
    /// Mikrofon stummgeschaltet
    AudioStumm,
    /// Kamera aktiv
    VideoAktiv,
    /// Bildschirmfreigabe aktiv
    Bildschirm,
}

/// Mitgliedschaft eines Benutzers in einem Raum
#[derive(Debug, Clone)]
pub struct Teilnehmer {
    pub id: ParticipantId,
    /// Anzeigename, nicht eindeutig
    pub name: String,
    pub is_host: bool,
    pub is_audio_muted: bool,
    pub is_video_enabled: bool,
    pub is_screen_sharing: bool,
    pub joined_at: DateTime<Utc>,
}

impl Teilnehmer {
    /// Erstellt einen neuen Teilnehmer mit Standard-Medienzustand
    /// (Mikrofon an, Kamera an, keine Bildschirmfreigabe)
    pub fn neu(name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            is_host,
            is_audio_muted: false,
            is_video_enabled: true,
            is_screen_sharing: false,
            joined_at: Utc::now(),
        }
    }

    /// Setzt ein Medien-Flag auf den gegebenen Wert
    pub fn flag_setzen(&mut self, flag: MedienFlag, wert: bool) {
        match flag {
            MedienFlag::AudioStumm => self.is_audio_muted = wert,
            MedienFlag::VideoAktiv => self.is_video_enabled = wert,
            MedienFlag::Bildschirm => self.is_screen_sharing = wert,
        }
    }
}

// ---------------------------------------------------------------------------
// Raum
// ---------------------------------------------------------------------------

/// Ergebnis einer Teilnehmer-Entfernung
#[derive(Debug, Clone)]
pub struct EntfernenErgebnis {
    /// Der entfernte Teilnehmer
    pub entfernt: Teilnehmer,
    /// Neuer Host falls die Rolle uebergeben wurde
    pub neuer_host: Option<ParticipantId>,
    /// true wenn der Raum danach leer ist und geloescht werden muss
    pub raum_leer: bool,
}

/// Ein Konferenzraum mit seinen Teilnehmern
#[derive(Debug)]
pub struct Raum {
    pub id: RoomId,
    pub created_at: DateTime<Utc>,
    /// Teilnehmer in Beitrittsreihenfolge
    teilnehmer: Vec<Teilnehmer>,
    /// Gesetzt sobald der Raum geschlossen wurde; blockt spaete Beitritte
    /// die den Raum noch ueber eine alte Referenz erreichen
    geschlossen: bool,
}

impl Raum {
    /// Erstellt einen neuen Raum mit dem Ersteller als Host
    pub fn neu(id: RoomId, host: Teilnehmer) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            teilnehmer: vec![host],
            geschlossen: false,
        }
    }

    /// Fuegt einen Teilnehmer am Ende der Beitrittsreihenfolge hinzu
    pub fn beitreten(&mut self, teilnehmer: Teilnehmer) {
        self.teilnehmer.push(teilnehmer);
    }

    /// Alle Teilnehmer in Beitrittsreihenfolge
    pub fn teilnehmer(&self) -> &[Teilnehmer] {
        &self.teilnehmer
    }

    pub fn anzahl(&self) -> usize {
        self.teilnehmer.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.teilnehmer.is_empty()
    }

    /// Markiert den Raum als geschlossen
    pub fn schliessen(&mut self) {
        self.geschlossen = true;
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.geschlossen
    }

    /// Sucht einen Teilnehmer nach ID
    pub fn finde(&self, id: ParticipantId) -> Option<&Teilnehmer> {
        self.teilnehmer.iter().find(|t| t.id == id)
    }

    /// Sucht einen Teilnehmer nach ID (veraenderbar)
    pub fn finde_mut(&mut self, id: ParticipantId) -> Option<&mut Teilnehmer> {
        self.teilnehmer.iter_mut().find(|t| t.id == id)
    }

    pub fn enthaelt(&self, id: ParticipantId) -> bool {
        self.finde(id).is_some()
    }

    /// Der aktuelle Host, None nur bei leerem Raum
    pub fn host(&self) -> Option<&Teilnehmer> {
        self.teilnehmer.iter().find(|t| t.is_host)
    }

    pub fn ist_host(&self, id: ParticipantId) -> bool {
        self.finde(id).map(|t| t.is_host).unwrap_or(false)
    }

    /// Entfernt einen Teilnehmer und uebergibt falls noetig die Host-Rolle
    ///
    /// War der Entfernte Host und bleiben andere uebrig, wird der am
    /// laengsten anwesende Teilnehmer (vorderster Eintrag) neuer Host.
    /// Gibt None zurueck wenn die ID nicht im Raum ist.
    pub fn entfernen(&mut self, id: ParticipantId) -> Option<EntfernenErgebnis> {
        let index = self.teilnehmer.iter().position(|t| t.id == id)?;
        let entfernt = self.teilnehmer.remove(index);

        let neuer_host = if entfernt.is_host && !self.teilnehmer.is_empty() {
            self.teilnehmer[0].is_host = true;
            Some(self.teilnehmer[0].id)
        } else {
            None
        };

        Some(EntfernenErgebnis {
            entfernt,
            neuer_host,
            raum_leer: self.teilnehmer.is_empty(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
