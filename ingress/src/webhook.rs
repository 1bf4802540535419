//! Variant B: HTTP Webhook Ingress (§4.4) — the backup channel. Accepts
//! pre-enriched transactions over HTTP instead of a raw provider stream,
//! and doubles as the pipeline's `/health` endpoint.

use crate::{try_forward, Ingress};
use async_trait::async_trait;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use types::{Candidate, ChannelHealthRecord, ChannelPayload, ChannelState, EnrichedTx, HealthSnapshot, HealthSnapshotProvider};

struct WebhookState {
    sink: mpsc::Sender<Candidate>,
    channel_id: String,
    counters: telemetry::Counters,
    health_provider: Arc<dyn HealthSnapshotProvider>,
    health: Arc<Mutex<ChannelHealthRecord>>,
}

pub struct WebhookIngress {
    port: u16,
    channel_id: String,
    counters: telemetry::Counters,
    health_provider: Arc<dyn HealthSnapshotProvider>,
    health: Arc<Mutex<ChannelHealthRecord>>,
    cancel: CancellationToken,
}

impl WebhookIngress {
    pub fn new(port: u16, channel_id: impl Into<String>, counters: telemetry::Counters, health_provider: Arc<dyn HealthSnapshotProvider>) -> Self {
        let channel_id = channel_id.into();
        Self {
            port,
            health: Arc::new(Mutex::new(ChannelHealthRecord::new(channel_id.clone()))),
            channel_id,
            counters,
            health_provider,
            cancel: CancellationToken::new(),
        }
    }

    /// Build the router directly, without binding a socket — used by tests
    /// to drive requests through `tower::ServiceExt::oneshot`.
    pub fn router(&self, sink: mpsc::Sender<Candidate>) -> Router {
        let state = Arc::new(WebhookState {
            sink,
            channel_id: self.channel_id.clone(),
            counters: self.counters.clone(),
            health_provider: self.health_provider.clone(),
            health: self.health.clone(),
        });
        Router::new()
            .route("/webhook", post(handle_webhook))
            .route("/health", get(handle_health))
            .with_state(state)
    }
}

#[async_trait]
impl Ingress for WebhookIngress {
    async fn start(&self, sink: mpsc::Sender<Candidate>) {
        self.health.lock().expect("health lock poisoned").state = ChannelState::Active;
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!(port = self.port, error = %err, "webhook ingress failed to bind");
                self.health.lock().expect("health lock poisoned").state = ChannelState::Disabled;
                return;
            }
        };

        let router = self.router(sink);
        let cancel = self.cancel.clone();
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            cancel.cancelled().await;
        });

        if let Err(err) = serve.await {
            tracing::error!(error = %err, "webhook ingress server error");
        }
        self.health.lock().expect("health lock poisoned").state = ChannelState::Disabled;
    }

    async fn stop(&self) {
        self.cancel.cancel();
    }

    fn health(&self) -> ChannelHealthRecord {
        self.health.lock().expect("health lock poisoned").clone()
    }
}

/// Accepts a list of pre-enriched transactions and enqueues each. Always
/// returns 200: validation failures are logged, never surfaced as HTTP
/// errors, to keep the provider from disabling the webhook (§6).
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    body: Result<Json<Vec<EnrichedTx>>, axum::extract::rejection::JsonRejection>,
) -> axum::http::StatusCode {
    let transactions = match body {
        Ok(Json(transactions)) => transactions,
        Err(err) => {
            tracing::warn!(error = %err, "webhook payload failed validation, dropping");
            return axum::http::StatusCode::OK;
        }
    };

    for tx in transactions {
        {
            let mut health = state.health.lock().expect("health lock poisoned");
            health.last_message_at = Some(std::time::Instant::now());
            health.state = ChannelState::Active;
        }
        let candidate = Candidate {
            arrival_timestamp: tx.timestamp,
            payload: ChannelPayload::Enriched(tx),
            channel_id: state.channel_id.clone(),
        };
        try_forward(&state.sink, candidate, &state.counters);
    }
    axum::http::StatusCode::OK
}

async fn handle_health(State(state): State<Arc<WebhookState>>) -> Json<HealthSnapshot> {
    Json(state.health_provider.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct StubHealthProvider;
    impl HealthSnapshotProvider for StubHealthProvider {
        fn snapshot(&self) -> HealthSnapshot {
            HealthSnapshot {
                channels: HashMap::new(),
                reservation_count: 0,
                rate_limit_pool_size: 2,
                emitted_token_count: 0,
            }
        }
    }

    fn ingress() -> WebhookIngress {
        WebhookIngress::new(0, "webhook", telemetry::Counters::new(), Arc::new(StubHealthProvider))
    }

    #[tokio::test]
    async fn webhook_post_enqueues_each_transaction_and_returns_200() {
        let ingress = ingress();
        let (tx, mut rx) = mpsc::channel(8);
        let app = ingress.router(tx);

        let body = serde_json::json!([
            {
                "signature": "sig-1",
                "timestamp": 1_700_000_000,
                "type": "SWAP",
                "feePayer": "WALLET_A",
                "nativeTransfers": [],
                "tokenTransfers": []
            }
        ]);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let candidate = rx.recv().await.unwrap();
        assert!(matches!(candidate.payload, ChannelPayload::Enriched(_)));
    }

    #[tokio::test]
    async fn malformed_body_still_returns_200() {
        let ingress = ingress();
        let (tx, _rx) = mpsc::channel(8);
        let app = ingress.router(tx);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpoint_serves_the_injected_snapshot() {
        let ingress = ingress();
        let (tx, _rx) = mpsc::channel(8);
        let app = ingress.router(tx);

        let response = app
            .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
