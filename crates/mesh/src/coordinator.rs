//! Mesh-Koordinator – Verhandlung der Vollvermaschung
//!
//! Haelt pro entferntem Teilnehmer einen Link und setzt die
//! Verhandlungsregeln um:
//! - **Initiator-Regel**: die Seite mit der lexikographisch kleineren
//!   Teilnehmer-ID erstellt das Angebot, die andere wartet. Damit ist
//!   fuer jedes Paar eindeutig, wer beginnt, egal in welcher
//!   Reihenfolge sich die Seiten entdecken.
//! - Kandidaten, die vor der entfernten Beschreibung eintreffen, werden
//!   gepuffert und danach in Eintreff-Reihenfolge nachgespielt.
//! - Spur-Ersatz laeuft in-place; Transporte ohne diese Faehigkeit
//!   verhandeln komplett neu.
//!
//! Ausgehende Wire-Nachrichten werden dem Aufrufer zurueckgegeben und
//! von der Signaling-Session an den Server gereicht. Der Koordinator
//! haelt keine Render-Handles; Abonnenten bekommen [`MeshEvent`]s und
//! besorgen sich Medien selbst beim Transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use palaver_core::types::ParticipantId;
use palaver_protocol::control::{
    AnswerRelay, ClientMessage, IceCandidateRelay, OfferRelay, ParticipantInfo,
};
use tokio::sync::broadcast;

use crate::error::{MeshError, MeshResult};
use crate::link::{LinkZustand, PeerLink};
use crate::transport::TransportFactory;

/// Standard-Wartezeit auf die Antwort, bevor ein Angebot als gescheitert gilt
pub const STANDARD_VERHANDLUNGS_TIMEOUT: Duration = Duration::from_secs(30);

/// Kapazitaet des Ereignis-Kanals; langsame Abonnenten verlieren aelteste Eintraege
const EREIGNIS_KAPAZITAET: usize = 64;

// ---------------------------------------------------------------------------
// Ereignisse
// ---------------------------------------------------------------------------

/// Ereignisse des Koordinators an GUI, CLI oder Tests
#[derive(Debug, Clone)]
pub enum MeshEvent {
    /// Ein Link zu einem neuen Peer wurde angelegt
    PeerHinzugefuegt { peer: ParticipantId },
    /// Der Link zu einem Peer wurde abgebaut
    PeerEntfernt { peer: ParticipantId },
    /// Die Gegenseite hat einen Medien-Stream bereitgestellt
    RemoteStream { peer: ParticipantId, stream_id: String },
    /// Verhandlung oder Transport eines Links ist fehlgeschlagen
    Fehler { peer: ParticipantId, meldung: String },
}

// ---------------------------------------------------------------------------
// Koordinator
// ---------------------------------------------------------------------------

/// Verwaltet alle Peer-Links einer Raum-Sitzung
///
/// Alle Methoden laufen ueber `&mut self`; der Besitzer (die
/// Sitzungsschleife) serialisiert damit saemtliche Verhandlungsschritte.
pub struct MeshCoordinator {
    lokale_id: ParticipantId,
    factory: Arc<dyn TransportFactory>,
    links: HashMap<ParticipantId, PeerLink>,
    ereignisse: broadcast::Sender<MeshEvent>,
    verhandlungs_timeout: Duration,
}

impl MeshCoordinator {
    pub fn neu(lokale_id: ParticipantId, factory: Arc<dyn TransportFactory>) -> Self {
        Self::mit_timeout(lokale_id, factory, STANDARD_VERHANDLUNGS_TIMEOUT)
    }

    pub fn mit_timeout(
        lokale_id: ParticipantId,
        factory: Arc<dyn TransportFactory>,
        verhandlungs_timeout: Duration,
    ) -> Self {
        let (ereignisse, _) = broadcast::channel(EREIGNIS_KAPAZITAET);
        Self {
            lokale_id,
            factory,
            links: HashMap::new(),
            ereignisse,
            verhandlungs_timeout,
        }
    }

    /// Einen Empfaenger fuer Koordinator-Ereignisse anlegen
    pub fn ereignisse_abonnieren(&self) -> broadcast::Receiver<MeshEvent> {
        self.ereignisse.subscribe()
    }

    pub fn lokale_id(&self) -> ParticipantId {
        self.lokale_id
    }

    /// Anzahl aller Links, unabhaengig vom Zustand
    pub fn link_anzahl(&self) -> usize {
        self.links.len()
    }

    /// IDs aller Peers mit Link im Zustand `Connected`, sortiert
    pub fn verbundene_peers(&self) -> Vec<ParticipantId> {
        let mut peers: Vec<ParticipantId> = self
            .links
            .values()
            .filter(|link| link.zustand == LinkZustand::Connected)
            .map(|link| link.peer)
            .collect();
        peers.sort();
        peers
    }

    pub fn zustand_von(&self, peer: ParticipantId) -> Option<LinkZustand> {
        self.links.get(&peer).map(|link| link.zustand)
    }

    // -----------------------------------------------------------------------
    // Peer-Entdeckung
    // -----------------------------------------------------------------------

    /// Den Roster-Schnappschuss aus `room-participants` uebernehmen
    ///
    /// Der eigene Eintrag wird uebersprungen. Liefert die Angebote fuer
    /// alle Peers, bei denen die lokale Seite Initiator ist.
    pub async fn roster_uebernehmen(
        &mut self,
        teilnehmer: &[ParticipantInfo],
    ) -> MeshResult<Vec<ClientMessage>> {
        let mut nachrichten = Vec::new();
        for info in teilnehmer {
            nachrichten.extend(self.peer_aufnehmen(info.id).await?);
        }
        Ok(nachrichten)
    }

    /// Einen per `user-joined` gemeldeten Peer aufnehmen
    pub async fn peer_beigetreten(
        &mut self,
        peer: ParticipantId,
    ) -> MeshResult<Vec<ClientMessage>> {
        self.peer_aufnehmen(peer).await
    }

    /// Link anlegen und je nach Initiator-Regel sofort anbieten
    ///
    /// Idempotent: existiert schon ein Link (etwa weil ein Angebot die
    /// `user-joined`-Meldung ueberholt hat), passiert nichts.
    async fn peer_aufnehmen(&mut self, peer: ParticipantId) -> MeshResult<Vec<ClientMessage>> {
        if peer == self.lokale_id || self.links.contains_key(&peer) {
            return Ok(Vec::new());
        }

        let transport = self.factory.verbindung_erstellen(peer).await?;
        let mut link = PeerLink::neu(peer, Arc::clone(&transport));
        let mut nachrichten = Vec::new();

        if self.ist_initiator(peer) {
            match link.transport.angebot_erstellen().await {
                Ok(angebot) => {
                    link.zustand = LinkZustand::OfferSent;
                    link.angebot_gesendet_um = Some(Instant::now());
                    nachrichten.push(ClientMessage::Offer(OfferRelay {
                        target: peer,
                        offer: angebot,
                    }));
                }
                Err(e) => {
                    transport.schliessen().await;
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            peer = %peer,
            initiator = self.ist_initiator(peer),
            "Peer-Link angelegt"
        );
        self.links.insert(peer, link);
        self.melden(MeshEvent::PeerHinzugefuegt { peer });
        Ok(nachrichten)
    }

    fn ist_initiator(&self, peer: ParticipantId) -> bool {
        self.lokale_id < peer
    }

    // -----------------------------------------------------------------------
    // Eingehende Signale
    // -----------------------------------------------------------------------

    /// Ein weitergeleitetes Angebot der Gegenseite verarbeiten
    ///
    /// Liefert die Antwort-Nachricht fuer den Absender, oder nichts, wenn
    /// das Angebot wegen der Initiator-Regel verworfen wurde.
    pub async fn angebot_empfangen(
        &mut self,
        von: ParticipantId,
        angebot: &serde_json::Value,
    ) -> MeshResult<Vec<ClientMessage>> {
        let lokale_id = self.lokale_id;
        let link = self.link_sicherstellen(von).await?;

        match link.zustand {
            // Glare und die lokale Seite ist der rechtmaessige Initiator:
            // das fremde Angebot wird verworfen, die Gegenseite antwortet
            // auf unser noch offenes Angebot.
            LinkZustand::OfferSent if lokale_id < von => {
                tracing::warn!(peer = %von, "Angebot trotz eigener Initiator-Rolle erhalten, verworfen");
                Ok(Vec::new())
            }
            // Idle: regulaerer Antwort-Pfad. OfferSent: Glare verloren,
            // das eigene Angebot wird zugunsten des fremden aufgegeben.
            LinkZustand::Idle | LinkZustand::OfferSent => {
                let antwort = link.transport.angebot_anwenden(angebot).await?;
                link.kandidaten_nachspielen().await?;
                link.zustand = LinkZustand::Connected;
                link.angebot_gesendet_um = None;
                tracing::debug!(peer = %von, "Angebot beantwortet, Link verbunden");
                Ok(vec![ClientMessage::Answer(AnswerRelay {
                    target: von,
                    answer: antwort,
                })])
            }
            // Neuverhandlung im laufenden Betrieb, etwa nach Spur-Ersatz
            // der Gegenseite
            LinkZustand::Connected => {
                let antwort = link.transport.angebot_anwenden(angebot).await?;
                tracing::debug!(peer = %von, "Neuverhandlung beantwortet");
                Ok(vec![ClientMessage::Answer(AnswerRelay {
                    target: von,
                    answer: antwort,
                })])
            }
            LinkZustand::Closed => Err(MeshError::UngueltigerZustand(format!(
                "Angebot fuer geschlossenen Link {von}"
            ))),
        }
    }

    /// Die Antwort der Gegenseite auf das eigene Angebot verarbeiten
    pub async fn antwort_empfangen(
        &mut self,
        von: ParticipantId,
        antwort: &serde_json::Value,
    ) -> MeshResult<()> {
        let link = match self.links.get_mut(&von) {
            Some(link) => link,
            None => return Err(MeshError::UnbekannterPeer(von)),
        };
        if link.zustand != LinkZustand::OfferSent {
            return Err(MeshError::UngueltigerZustand(format!(
                "Antwort von {von} im Zustand {:?}",
                link.zustand
            )));
        }

        link.transport.antwort_anwenden(antwort).await?;
        link.kandidaten_nachspielen().await?;
        link.zustand = LinkZustand::Connected;
        link.angebot_gesendet_um = None;
        tracing::debug!(peer = %von, "Antwort angewendet, Link verbunden");
        Ok(())
    }

    /// Einen weitergeleiteten Transport-Kandidaten verarbeiten
    ///
    /// Vor der entfernten Beschreibung wird gepuffert, danach direkt an
    /// den Transport gegeben. Kandidaten duerfen `user-joined` ueberholen,
    /// der Link entsteht dann hier.
    pub async fn kandidat_empfangen(
        &mut self,
        von: ParticipantId,
        kandidat: &serde_json::Value,
    ) -> MeshResult<()> {
        let link = self.link_sicherstellen(von).await?;
        link.kandidat_aufnehmen(kandidat).await
    }

    /// Einen lokal gefundenen Kandidaten als Wire-Nachricht verpacken
    pub fn lokaler_kandidat(
        &self,
        ziel: ParticipantId,
        kandidat: serde_json::Value,
    ) -> MeshResult<ClientMessage> {
        if !self.links.contains_key(&ziel) {
            return Err(MeshError::UnbekannterPeer(ziel));
        }
        Ok(ClientMessage::IceCandidate(IceCandidateRelay {
            target: ziel,
            candidate: kandidat,
        }))
    }

    // -----------------------------------------------------------------------
    // Spur-Ersatz
    // -----------------------------------------------------------------------

    /// Die ausgehende Video-Spur auf allen verbundenen Links ersetzen
    ///
    /// Links, deren Transport den Ersatz im laufenden Betrieb nicht kann,
    /// verhandeln stattdessen komplett neu; die dafuer erzeugten Angebote
    /// werden zurueckgegeben. Andere Fehler werden als [`MeshEvent::Fehler`]
    /// gemeldet, die uebrigen Links bleiben unberuehrt.
    pub async fn video_spur_ersetzen(&mut self, spur_id: &str) -> MeshResult<Vec<ClientMessage>> {
        let mut nachrichten = Vec::new();
        let mut fehlgeschlagen = Vec::new();
        let jetzt = Instant::now();

        for link in self.links.values_mut() {
            if link.zustand != LinkZustand::Connected {
                continue;
            }
            match link.transport.video_spur_ersetzen(spur_id).await {
                Ok(()) => {}
                Err(MeshError::SpurErsatzNichtUnterstuetzt) => {
                    // Rueckfall: volle Neuverhandlung ueber ein frisches Angebot
                    match link.transport.angebot_erstellen().await {
                        Ok(angebot) => {
                            link.zustand = LinkZustand::OfferSent;
                            link.angebot_gesendet_um = Some(jetzt);
                            nachrichten.push(ClientMessage::Offer(OfferRelay {
                                target: link.peer,
                                offer: angebot,
                            }));
                        }
                        Err(e) => fehlgeschlagen.push((link.peer, e.to_string())),
                    }
                }
                Err(e) => fehlgeschlagen.push((link.peer, e.to_string())),
            }
        }

        for (peer, meldung) in fehlgeschlagen {
            tracing::warn!(peer = %peer, fehler = %meldung, "Spur-Ersatz fehlgeschlagen");
            self.melden(MeshEvent::Fehler { peer, meldung });
        }
        Ok(nachrichten)
    }

    // -----------------------------------------------------------------------
    // Abbau
    // -----------------------------------------------------------------------

    /// Den Link zu einem Peer abbauen (`user-left`, `participant-kicked`)
    pub async fn peer_verlassen(&mut self, peer: ParticipantId) {
        if let Some(mut link) = self.links.remove(&peer) {
            link.schliessen().await;
            tracing::debug!(peer = %peer, "Peer-Link abgebaut");
            self.melden(MeshEvent::PeerEntfernt { peer });
        }
    }

    /// Alle Links abbauen (Raum verlassen oder Sitzungsende)
    pub async fn alle_schliessen(&mut self) {
        for (peer, mut link) in std::mem::take(&mut self.links) {
            link.schliessen().await;
            self.melden(MeshEvent::PeerEntfernt { peer });
        }
    }

    /// Offene Angebote aelter als der Verhandlungs-Timeout abraeumen
    ///
    /// Der Besitzer ruft das periodisch mit der aktuellen Zeit auf;
    /// betroffene Links werden geschlossen und als [`MeshEvent::Fehler`]
    /// gemeldet. Liefert die abgelaufenen Peer-IDs.
    pub async fn timeouts_pruefen(&mut self, jetzt: Instant) -> Vec<ParticipantId> {
        let abgelaufen: Vec<ParticipantId> = self
            .links
            .values()
            .filter(|link| match link.angebot_gesendet_um {
                Some(gesendet) => {
                    jetzt.saturating_duration_since(gesendet) >= self.verhandlungs_timeout
                }
                None => false,
            })
            .map(|link| link.peer)
            .collect();

        for peer in &abgelaufen {
            if let Some(mut link) = self.links.remove(peer) {
                link.schliessen().await;
                tracing::warn!(peer = %peer, "Verhandlung abgelaufen, Link wird abgebaut");
                self.melden(MeshEvent::Fehler {
                    peer: *peer,
                    meldung: MeshError::VerhandlungAbgelaufen(*peer).to_string(),
                });
                self.melden(MeshEvent::PeerEntfernt { peer: *peer });
            }
        }
        abgelaufen
    }

    // -----------------------------------------------------------------------
    // Medien-Ereignisse
    // -----------------------------------------------------------------------

    /// Einen von der Medien-Engine gemeldeten entfernten Stream weitergeben
    ///
    /// Der Koordinator haelt das Medium nicht selbst; Abonnenten bekommen
    /// nur die Stream-ID und holen das Medium beim Transport ab.
    pub fn remote_stream_gemeldet(&self, peer: ParticipantId, stream_id: &str) -> MeshResult<()> {
        if !self.links.contains_key(&peer) {
            return Err(MeshError::UnbekannterPeer(peer));
        }
        self.melden(MeshEvent::RemoteStream {
            peer,
            stream_id: stream_id.to_string(),
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    /// Link nachschlagen und bei Bedarf anlegen
    ///
    /// Angebote und Kandidaten duerfen die `user-joined`-Meldung ueberholen.
    async fn link_sicherstellen(&mut self, peer: ParticipantId) -> MeshResult<&mut PeerLink> {
        if !self.links.contains_key(&peer) {
            let transport = self.factory.verbindung_erstellen(peer).await?;
            self.links.insert(peer, PeerLink::neu(peer, transport));
            tracing::debug!(peer = %peer, "Peer-Link implizit angelegt");
            self.melden(MeshEvent::PeerHinzugefuegt { peer });
        }
        match self.links.get_mut(&peer) {
            Some(link) => Ok(link),
            None => Err(MeshError::UnbekannterPeer(peer)),
        }
    }

    /// Ereignis an alle Abonnenten geben; ohne Abonnenten verfaellt es
    fn melden(&self, ereignis: MeshEvent) {
        let _ = self.ereignisse.send(ereignis);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
