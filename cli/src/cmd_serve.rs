//! `chainpretty serve`: HTTP receiver for Alchemy custom webhooks, plus an
//! on-demand render endpoint for single transactions.

use alloy_primitives::B256;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    pipeline::{deliver, Summary},
    settings::RenderEnv,
};

pub struct AppState {
    pub env: RenderEnv,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Handler error carrying the HTTP status to answer with.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn bad_request(error: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(error: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(error = %format!("{:#}", self.error), "request failed");
        }
        let body = Json(serde_json::json!({ "error": format!("{:#}", self.error) }));
        (self.status, body).into_response()
    }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn alchemy_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<Summary>, AppError> {
    let env = &state.env;
    let txs = env
        .decoder
        .decode_graphql_txs(&payload, Arc::clone(&env.chain))
        .map_err(AppError::bad_request)?;
    let summary = deliver(env, &txs, &env.outputs).await?;
    info!(
        events = summary.events,
        messages = summary.messages,
        failed = summary.failed,
        "webhook processed"
    );
    Ok(Json(summary))
}

async fn render_tx(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let tx_hash: B256 = hash
        .parse()
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("invalid tx hash '{hash}': {e}")))?;
    let env = &state.env;
    let tx_logs = env.rpc()?.tx_logs(&env.decoder, &env.chain, tx_hash).await?;
    let rendered = tx_logs.events().filter_map(|e| env.render(e)).collect();
    Ok(Json(rendered))
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/alchemy-webhook/", post(alchemy_webhook))
        .route("/render/tx/:hash", get(render_tx))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(env: RenderEnv, bind: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState { env }));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{fixture_settings, fixtures};
    use axum::{body::Body, http::Request};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    async fn app() -> Router {
        let env = RenderEnv::setup(&fixture_settings()).await.unwrap();
        router(Arc::new(AppState { env }))
    }

    fn sample_request(uri: &str) -> Request<Body> {
        let sample = std::fs::read_to_string(fixtures().join("samples/alchemy-sample.json")).unwrap();
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(sample))
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn webhook_payload_is_batched() {
        let resp = app().await.oneshot(sample_request("/alchemy-webhook/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["events"], 3);
        assert_eq!(summary["messages"], 1);
        assert_eq!(summary["unmatched"], 2);
        assert_eq!(summary["failed"], 0);
    }

    /// Stand-in Discord endpoint that records every posted message.
    async fn discord_stub() -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/api/webhooks/1/token",
                post(|State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    seen.lock().await.push(body);
                    StatusCode::NO_CONTENT
                }),
            )
            .with_state(Arc::clone(&received));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/api/webhooks/1/token"), received)
    }

    #[tokio::test]
    async fn webhook_delivers_to_discord() {
        let (url, received) = discord_stub().await;
        let mut settings = fixture_settings();
        settings.discord_url = Some(url);
        let env = RenderEnv::setup(&settings).await.unwrap();
        let app = Router::new()
            .route("/hook", post(alchemy_webhook))
            .with_state(Arc::new(AppState { env }));

        let resp = app.oneshot(sample_request("/hook")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["messages"], 1);
        assert_eq!(summary["failed"], 0);

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        let text = received[0]["embeds"][0]["description"].as_str().unwrap();
        assert!(text.starts_with("Transfer 10000 from "));
    }

    #[tokio::test]
    async fn unreachable_discord_counts_as_failed() {
        let mut settings = fixture_settings();
        settings.discord_url = Some("http://127.0.0.1:9/api/webhooks/1/token".into());
        let env = RenderEnv::setup(&settings).await.unwrap();
        let resp = router(Arc::new(AppState { env }))
            .oneshot(sample_request("/alchemy-webhook/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["failed"], 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/alchemy-webhook/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"event": {}}"#))
            .unwrap();
        let resp = app().await.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn render_tx_needs_rpc() {
        let app = app().await;
        let bad = Request::builder()
            .uri("/render/tx/0x1234")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(bad).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let hash = "0x37a50ac80e26cbf0005469713177e3885800188d80b92134f150685e931aa4bf";
        let req = Request::builder()
            .uri(format!("/render/tx/{hash}"))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("--rpc-url"));
    }
}
