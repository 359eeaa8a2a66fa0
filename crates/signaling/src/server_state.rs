//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Broadcaster und Konfiguration als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use palaver_rooms::RoomRegistry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::broadcast::RoomBroadcaster;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale gleichzeitige Verbindungen, 0 = unbegrenzt
    pub max_verbindungen: usize,
    /// Maximale Teilnehmer pro Raum, 0 = unbegrenzt
    pub max_teilnehmer_pro_raum: usize,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt (nur fuer Entwicklung).
    pub cors_origins: Vec<String>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_verbindungen: 512,
            max_teilnehmer_pro_raum: 0,
            cors_origins: vec![],
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Registry und Broadcaster sind selbst Arc-basiert; Clone des States
/// gibt eine Referenz auf denselben inneren Zustand.
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Raum-Registry (autoritativer Raum- und Teilnehmer-Zustand)
    pub registry: RoomRegistry,
    /// Broadcaster (Ereignisse an gebundene Verbindungen)
    pub broadcaster: RoomBroadcaster,
    /// Shutdown-Signal, wird an jede Session weitergereicht
    pub shutdown_rx: watch::Receiver<bool>,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, shutdown_rx: watch::Receiver<bool>) -> Arc<Self> {
        let registry = RoomRegistry::neu(config.max_teilnehmer_pro_raum);
        Arc::new(Self {
            config: Arc::new(config),
            registry,
            broadcaster: RoomBroadcaster::neu(),
            shutdown_rx,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<SignalingState> {
    let (_tx, rx) = watch::channel(false);
    SignalingState::neu(SignalingConfig::default(), rx)
}
