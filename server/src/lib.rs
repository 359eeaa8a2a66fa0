//! palaver-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use palaver_signaling::{HttpServer, SignalingState};
use tokio::sync::watch;

use config::PalaverConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: PalaverConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: PalaverConfig) -> Self {
        Self { config }
    }

    /// Startet den HTTP-Server und laeuft bis zum Shutdown-Signal
    ///
    /// REST-API und WebSocket-Endpunkt teilen sich einen Listener. Das
    /// Shutdown-Signal wandert ueber einen watch-Kanal an den Listener
    /// und alle offenen Sessions; `starten` kehrt erst zurueck, wenn
    /// alle Verbindungen abgebaut sind.
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %self.config.http_bind_adresse(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = SignalingState::neu(self.config.signaling_config(), shutdown_rx);

        let adresse: SocketAddr = self.config.http_bind_adresse().parse()?;
        let mut http_task = tokio::spawn(HttpServer::neu(adresse).starten(Arc::clone(&state)));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::select! {
            ergebnis = &mut http_task => {
                // Der Listener ist von selbst gestorben, etwa durch einen Bind-Fehler
                return ergebnis?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            }
        }

        // Sessions verabschieden sich mit `room-closed` und bauen ab
        let _ = shutdown_tx.send(true);
        http_task.await??;

        tracing::info!(
            raeume = state.registry.anzahl_raeume(),
            "Server beendet"
        );
        Ok(())
    }
}
