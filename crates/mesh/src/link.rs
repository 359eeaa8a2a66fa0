//! Zustand eines einzelnen Peer-Links
//!
//! Die Verhandlung pro Gegenseite laeuft durch eine kleine
//! Zustandsmaschine: `Idle -> OfferSent -> Connected -> Closed`, wobei
//! die Antwort-Seite `OfferSent` ueberspringt und direkt nach
//! `Connected` wechselt.

use std::sync::Arc;
use std::time::Instant;

use palaver_core::types::ParticipantId;

use crate::error::MeshResult;
use crate::transport::PeerTransport;

// ---------------------------------------------------------------------------
// Zustandsmaschine
// ---------------------------------------------------------------------------

/// Verhandlungs-Zustand eines Peer-Links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkZustand {
    /// Link angelegt, noch keine Beschreibung ausgetauscht
    Idle,
    /// Eigenes Angebot unterwegs, Antwort steht aus
    OfferSent,
    /// Beschreibungen ausgetauscht, Medien koennen fliessen
    Connected,
    /// Link abgebaut, Transport freigegeben
    Closed,
}

// ---------------------------------------------------------------------------
// Peer-Link
// ---------------------------------------------------------------------------

/// Verhandlungskontext fuer genau einen entfernten Teilnehmer
pub(crate) struct PeerLink {
    pub(crate) peer: ParticipantId,
    pub(crate) zustand: LinkZustand,
    pub(crate) transport: Arc<dyn PeerTransport>,
    /// Kandidaten, die vor der entfernten Beschreibung eingetroffen sind
    kandidaten_puffer: Vec<serde_json::Value>,
    /// Wurde schon eine entfernte Beschreibung (Angebot oder Antwort) angewendet?
    pub(crate) remote_beschreibung: bool,
    /// Sendezeitpunkt des offenen Angebots, fuer den Timeout-Sweep
    pub(crate) angebot_gesendet_um: Option<Instant>,
}

impl PeerLink {
    pub(crate) fn neu(peer: ParticipantId, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            peer,
            zustand: LinkZustand::Idle,
            transport,
            kandidaten_puffer: Vec::new(),
            remote_beschreibung: false,
            angebot_gesendet_um: None,
        }
    }

    /// Einen Kandidaten anwenden oder bis zur entfernten Beschreibung puffern
    pub(crate) async fn kandidat_aufnehmen(
        &mut self,
        kandidat: &serde_json::Value,
    ) -> MeshResult<()> {
        if self.remote_beschreibung {
            self.transport.kandidat_hinzufuegen(kandidat).await
        } else {
            self.kandidaten_puffer.push(kandidat.clone());
            Ok(())
        }
    }

    /// Gepufferte Kandidaten in Eintreff-Reihenfolge an den Transport geben
    ///
    /// Wird genau dann aufgerufen, wenn die entfernte Beschreibung
    /// angewendet wurde.
    pub(crate) async fn kandidaten_nachspielen(&mut self) -> MeshResult<()> {
        self.remote_beschreibung = true;
        for kandidat in std::mem::take(&mut self.kandidaten_puffer) {
            self.transport.kandidat_hinzufuegen(&kandidat).await?;
        }
        Ok(())
    }

    /// Den Link endgueltig abbauen und den Transport freigeben
    pub(crate) async fn schliessen(&mut self) {
        self.zustand = LinkZustand::Closed;
        self.angebot_gesendet_um = None;
        self.transport.schliessen().await;
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("peer", &self.peer)
            .field("zustand", &self.zustand)
            .field("gepufferte_kandidaten", &self.kandidaten_puffer.len())
            .field("remote_beschreibung", &self.remote_beschreibung)
            .finish()
    }
}
