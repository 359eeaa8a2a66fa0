//! Transport-Abstraktion fuer Peer-Links
//!
//! Der Koordinator kennt keine konkrete Medien-Engine. GUI-, CLI- und
//! Test-Harnische liefern ueber [`TransportFactory`] eigene
//! [`PeerTransport`]-Implementierungen; Angebots-, Antwort- und
//! Kandidaten-Blobs bleiben dabei opak ([`serde_json::Value`]).

use std::sync::Arc;

use async_trait::async_trait;
use palaver_core::types::ParticipantId;

use crate::error::MeshResult;

// ---------------------------------------------------------------------------
// Transport-Traits
// ---------------------------------------------------------------------------

/// Verhandlungs- und Medien-Operationen eines einzelnen Peer-Links
///
/// Eine Instanz gehoert genau einem Link und traegt dessen lokale Spuren.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Ein lokales Session-Angebot erzeugen
    async fn angebot_erstellen(&self) -> MeshResult<serde_json::Value>;

    /// Ein entferntes Angebot anwenden und die eigene Antwort erzeugen
    async fn angebot_anwenden(&self, angebot: &serde_json::Value) -> MeshResult<serde_json::Value>;

    /// Die Antwort der Gegenseite auf das eigene Angebot anwenden
    async fn antwort_anwenden(&self, antwort: &serde_json::Value) -> MeshResult<()>;

    /// Einen entfernten Transport-Kandidaten hinzufuegen
    ///
    /// Der Aufrufer stellt sicher, dass vorher eine entfernte Beschreibung
    /// angewendet wurde; fruehere Kandidaten puffert der Koordinator.
    async fn kandidat_hinzufuegen(&self, kandidat: &serde_json::Value) -> MeshResult<()>;

    /// Die ausgehende Video-Spur im laufenden Betrieb ersetzen
    ///
    /// Liefert [`MeshError::SpurErsatzNichtUnterstuetzt`], wenn der Transport
    /// das nicht kann; der Koordinator faellt dann auf eine volle
    /// Neuverhandlung zurueck.
    ///
    /// [`MeshError::SpurErsatzNichtUnterstuetzt`]: crate::error::MeshError::SpurErsatzNichtUnterstuetzt
    async fn video_spur_ersetzen(&self, spur_id: &str) -> MeshResult<()>;

    /// Den Link schliessen und alle angehaengten Spuren freigeben
    async fn schliessen(&self);
}

/// Fabrik fuer neue Peer-Transporte
///
/// `verbindung_erstellen` haengt die aktuellen lokalen Spuren an den neuen
/// Transport an, bevor er zurueckgegeben wird.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Einen frischen Transport fuer den angegebenen Peer erzeugen
    async fn verbindung_erstellen(&self, peer: ParticipantId) -> MeshResult<Arc<dyn PeerTransport>>;
}

// ---------------------------------------------------------------------------
// Test-Transport
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::error::MeshError;

    /// Aufzeichnender Transport fuer Koordinator-Tests
    pub(crate) struct MockTransport {
        peer: ParticipantId,
        spur_ersatz_unterstuetzt: bool,
        pub(crate) angewandte_angebote: Mutex<Vec<serde_json::Value>>,
        pub(crate) angewandte_antworten: Mutex<Vec<serde_json::Value>>,
        pub(crate) kandidaten: Mutex<Vec<serde_json::Value>>,
        pub(crate) ersetzte_spuren: Mutex<Vec<String>>,
        pub(crate) erzeugte_angebote: Mutex<u32>,
        geschlossen: AtomicBool,
    }

    impl MockTransport {
        pub(crate) fn neu(peer: ParticipantId, spur_ersatz_unterstuetzt: bool) -> Self {
            Self {
                peer,
                spur_ersatz_unterstuetzt,
                angewandte_angebote: Mutex::new(Vec::new()),
                angewandte_antworten: Mutex::new(Vec::new()),
                kandidaten: Mutex::new(Vec::new()),
                ersetzte_spuren: Mutex::new(Vec::new()),
                erzeugte_angebote: Mutex::new(0),
                geschlossen: AtomicBool::new(false),
            }
        }

        pub(crate) fn ist_geschlossen(&self) -> bool {
            self.geschlossen.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PeerTransport for MockTransport {
        async fn angebot_erstellen(&self) -> MeshResult<serde_json::Value> {
            let mut zaehler = self.erzeugte_angebote.lock();
            *zaehler += 1;
            Ok(json!({ "type": "offer", "fuer": self.peer.to_string(), "nr": *zaehler }))
        }

        async fn angebot_anwenden(
            &self,
            angebot: &serde_json::Value,
        ) -> MeshResult<serde_json::Value> {
            self.angewandte_angebote.lock().push(angebot.clone());
            Ok(json!({ "type": "answer", "fuer": self.peer.to_string() }))
        }

        async fn antwort_anwenden(&self, antwort: &serde_json::Value) -> MeshResult<()> {
            self.angewandte_antworten.lock().push(antwort.clone());
            Ok(())
        }

        async fn kandidat_hinzufuegen(&self, kandidat: &serde_json::Value) -> MeshResult<()> {
            self.kandidaten.lock().push(kandidat.clone());
            Ok(())
        }

        async fn video_spur_ersetzen(&self, spur_id: &str) -> MeshResult<()> {
            if !self.spur_ersatz_unterstuetzt {
                return Err(MeshError::SpurErsatzNichtUnterstuetzt);
            }
            self.ersetzte_spuren.lock().push(spur_id.to_string());
            Ok(())
        }

        async fn schliessen(&self) {
            self.geschlossen.store(true, Ordering::SeqCst);
        }
    }

    /// Fabrik, die alle erzeugten Mock-Transporte zur Inspektion aufhebt
    pub(crate) struct MockFactory {
        spur_ersatz_unterstuetzt: bool,
        pub(crate) erzeugte: Mutex<Vec<(ParticipantId, Arc<MockTransport>)>>,
    }

    impl MockFactory {
        pub(crate) fn neu() -> Self {
            Self {
                spur_ersatz_unterstuetzt: true,
                erzeugte: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn ohne_spur_ersatz() -> Self {
            Self {
                spur_ersatz_unterstuetzt: false,
                erzeugte: Mutex::new(Vec::new()),
            }
        }

        /// Den fuer `peer` erzeugten Transport nachschlagen (letzter gewinnt)
        pub(crate) fn transport_von(&self, peer: ParticipantId) -> Option<Arc<MockTransport>> {
            self.erzeugte
                .lock()
                .iter()
                .rev()
                .find(|(id, _)| *id == peer)
                .map(|(_, transport)| Arc::clone(transport))
        }
    }

    #[async_trait]
    impl TransportFactory for MockFactory {
        async fn verbindung_erstellen(
            &self,
            peer: ParticipantId,
        ) -> MeshResult<Arc<dyn PeerTransport>> {
            let transport = Arc::new(MockTransport::neu(peer, self.spur_ersatz_unterstuetzt));
            self.erzeugte.lock().push((peer, Arc::clone(&transport)));
            Ok(transport)
        }
    }
}
