//! Endpoint grafana's webhook contact point posts alert notifications to.
//! Each notification is answered with the atom feed rendered from it.
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::StringRejection, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::{feed::FeedRenderer, metrics::ReceiverMetrics, settings::Settings};

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReceiverSettings {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl ReceiverSettings {
    pub fn global() -> &'static Self {
        &Settings::global().webhook_receiver
    }

    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

struct ReceiverState {
    renderer: Arc<FeedRenderer>,
    metrics: &'static ReceiverMetrics,
}

async fn grafana_receiver(
    State(state): State<Arc<ReceiverState>>,
    payload: Result<String, StringRejection>,
) -> Response {
    let ReceiverState { renderer, metrics } = &*state;

    let payload = match payload {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!("failed to read webhook body: {:?}", err);
            metrics.record_failure("unreadable");
            return err.into_response();
        }
    };

    match renderer.render(&payload) {
        Ok(feed) => {
            metrics.record_feed(feed.entries);
            ([(CONTENT_TYPE, ATOM_CONTENT_TYPE)], feed.document).into_response()
        }
        Err(err) => {
            tracing::debug!("failed to convert webhook payload: {}", err);
            metrics.record_failure(err.kind());
            (err.status_code(), err.to_string()).into_response()
        }
    }
}

/// Routes of the webhook receiver, `POST /` and `POST /grafana`.
///
/// # Arguments
///
/// * `renderer` - renders the payloads into feeds
pub fn router(renderer: Arc<FeedRenderer>) -> Result<Router> {
    let metrics = ReceiverMetrics::global().context("failed to register webhook metrics")?;
    let state = Arc::new(ReceiverState { renderer, metrics });

    Ok(Router::new()
        .route("/", post(grafana_receiver))
        .route("/grafana", post(grafana_receiver))
        .with_state(state))
}

pub async fn run_webhook_receiver(renderer: Arc<FeedRenderer>) -> Result<()> {
    let addr = ReceiverSettings::global().to_socket_addr();
    let app = router(renderer)?;

    let listener = TcpListener::bind(addr)
        .await
        .context(format!("could not bind webhook receiver to {addr}"))?;

    tracing::info!("webhook receiver listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("webhook receiver crashed")?;

    Ok(())
}
