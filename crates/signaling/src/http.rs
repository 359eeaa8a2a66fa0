//! Axum HTTP-Server – REST-API und WebSocket-Upgrade
//!
//! Ein einzelner Server traegt beide Oberflaechen: die REST-Routen fuer
//! den Raum-Lebenszyklus und den `/ws`-Endpunkt, der Verbindungen
//! aufwertet und an eine `ClientSession` uebergibt.

use anyhow::Result;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::rest;
use crate::server_state::SignalingState;
use crate::session::ClientSession;

/// Axum HTTP-Server fuer Signaling und Raum-API
pub struct HttpServer {
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Erstellt einen neuen HttpServer
    pub fn neu(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }

    /// Startet den Server mit dem gegebenen State
    ///
    /// Laeuft bis der Shutdown-Kanal des States `true` liefert, laufende
    /// Antworten werden dann noch zu Ende geschrieben.
    pub async fn starten(self, state: Arc<SignalingState>) -> Result<()> {
        // CORS konfigurieren: entweder spezifische Origins oder Any
        let cors = cors_layer(&state.config.cors_origins);
        let mut shutdown_rx = state.shutdown_rx.clone();

        let app = api_router()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "HTTP-Server gestartet");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;

        tracing::info!("HTTP-Server gestoppt");
        Ok(())
    }

    /// Gibt die Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

/// Erstellt den vollstaendigen API-Router
fn api_router() -> Router<Arc<SignalingState>> {
    Router::new()
        // Raum-Lebenszyklus
        .route("/api/rooms/create", post(rest::raum_erstellen))
        .route("/api/rooms/:room_id/join", post(rest::raum_beitreten))
        .route(
            "/api/rooms/:room_id",
            get(rest::raum_info).delete(rest::raum_schliessen),
        )
        // Live-Signaling
        .route("/ws", get(ws_handler))
        // Betrieb
        .route("/health", get(health))
}

/// CORS konfigurieren: entweder spezifische Origins oder Any
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }
}

/// GET /ws – wertet die Verbindung auf und startet eine ClientSession
///
/// Das Verbindungslimit zaehlt gebundene Verbindungen.
async fn ws_handler(
    State(state): State<Arc<SignalingState>>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let max = state.config.max_verbindungen;
    if max > 0 && state.broadcaster.client_anzahl() >= max {
        tracing::warn!(peer = %peer_addr, max = max, "Server voll – Verbindung abgelehnt");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "Server ist voll" })),
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| ClientSession::neu(state, peer_addr).verarbeiten(socket))
}

/// GET /health – Health-Check mit Betriebskennzahlen
async fn health(State(state): State<Arc<SignalingState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "uptimeSeconds": state.uptime_sek(),
            "rooms": state.registry.anzahl_raeume(),
            "participants": state.registry.anzahl_teilnehmer(),
            "connections": state.broadcaster.client_anzahl(),
        })),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::test_state;

    async fn health_koerper(state: Arc<SignalingState>) -> serde_json::Value {
        let antwort = health(State(state)).await.into_response();
        assert_eq!(antwort.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .expect("Koerper muss lesbar sein");
        serde_json::from_slice(&bytes).expect("Koerper muss gueltiges JSON sein")
    }

    #[tokio::test]
    async fn health_auf_leerem_server() {
        let wert = health_koerper(test_state()).await;
        assert_eq!(wert["status"], "ok");
        assert_eq!(wert["rooms"], 0);
        assert_eq!(wert["participants"], 0);
        assert_eq!(wert["connections"], 0);
        assert!(wert["uptimeSeconds"].is_u64());
    }

    #[tokio::test]
    async fn health_zaehlt_raeume_und_teilnehmer() {
        let state = test_state();
        let (room_id, _host_id) = state.registry.raum_erstellen("Anna").unwrap();
        let ben = state.registry.raum_beitreten(room_id, "Ben").unwrap();
        let _rx = state.broadcaster.client_registrieren(ben.id);

        let wert = health_koerper(state).await;
        assert_eq!(wert["rooms"], 1);
        assert_eq!(wert["participants"], 2);
        assert_eq!(wert["connections"], 1);
    }
}
