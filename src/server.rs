// HTTP server: charge creation, webhook intake, status polling, static UI

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::mercadopago::charge_store::ChargeStore;
use crate::mercadopago::errors::ChargeError;
use crate::mercadopago::types::{format_brt_expiration, CreateChargeRequest};
use crate::mercadopago::{webhook, PixGateway};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PixGateway>,
    pub store: Arc<dyn ChargeStore>,
    pub payment_expiry: Duration,
}

pub async fn run_server(port: u16, public_dir: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state, public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState, public_dir: &str) -> Router {
    // The payment UI may be hosted elsewhere; keep CORS permissive like the
    // original deployment.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/criar-pagamento", post(create_charge))
        .route("/webhook", post(handle_webhook))
        .route("/check-payment-status/:payment_id", get(check_payment_status))
        .route("/health", get(health_check))
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Deserialize)]
pub struct CreateChargeBody {
    pub valor: Option<f64>,
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateChargeResponse {
    pub qr_code_base64: String,
    pub qr_code: String,
    pub payment_id: String,
    /// Epoch milliseconds of the expiration instant.
    pub expires_at: i64,
}

async fn create_charge(
    State(state): State<AppState>,
    Json(body): Json<CreateChargeBody>,
) -> Result<Json<CreateChargeResponse>, ChargeError> {
    let amount = body
        .valor
        .filter(|v| *v > 0.0)
        .ok_or_else(|| ChargeError::Validation("Valor inválido".to_string()))?;
    let order_id = body
        .order_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ChargeError::Validation("ID do pedido é obrigatório".to_string()))?;

    let expires_at = Utc::now()
        + chrono::Duration::from_std(state.payment_expiry)
            .unwrap_or_else(|_| chrono::Duration::minutes(7));

    let charge = state
        .gateway
        .create_charge(CreateChargeRequest {
            amount,
            description: format!("Pagamento do Pedido {} via Pix", order_id),
            date_of_expiration: format_brt_expiration(expires_at),
        })
        .await?;

    state.store.insert(&charge.payment_id, &order_id).await?;

    info!(
        payment_id = %charge.payment_id,
        order_id = %order_id,
        amount = amount,
        "Charge created"
    );

    Ok(Json(CreateChargeResponse {
        qr_code_base64: charge.qr_code_base64,
        qr_code: charge.qr_code,
        payment_id: charge.payment_id,
        expires_at: expires_at.timestamp_millis(),
    }))
}

async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    // Fire-and-forget contract: the gateway only needs the acknowledgment,
    // and re-delivers indefinitely without one. Failures are logged.
    if let Err(e) = webhook::process_notification(&body, &*state.gateway, &*state.store).await {
        error!("Webhook processing failed: {}", e);
    }
    (StatusCode::OK, "Webhook recebido e processado")
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

async fn check_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Json<StatusResponse> {
    match state.store.status_for_poll(&payment_id).await {
        None => Json(StatusResponse {
            status: "not_found",
            order_id: None,
        }),
        Some(record) => {
            info!(
                payment_id = %payment_id,
                status = %record.status,
                "Status poll"
            );
            Json(StatusResponse {
                status: record.status.as_str(),
                order_id: Some(record.order_id),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercadopago::charge_store::MemoryChargeStore;
    use crate::mercadopago::testing::MockGateway;
    use axum::response::IntoResponse;

    fn test_state(gateway: MockGateway) -> AppState {
        AppState {
            gateway: Arc::new(gateway),
            store: Arc::new(MemoryChargeStore::new()),
            payment_expiry: Duration::from_secs(7 * 60),
        }
    }

    fn create_body(valor: Option<f64>, order_id: Option<&str>) -> CreateChargeBody {
        CreateChargeBody {
            valor,
            order_id: order_id.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, _) = health_check().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_charge_seeds_pending_record() {
        let state = test_state(MockGateway::new("1001"));

        let before = Utc::now().timestamp_millis();
        let Json(resp) = create_charge(
            State(state.clone()),
            Json(create_body(Some(10.5), Some("ORD1"))),
        )
        .await
        .unwrap();

        assert_eq!(resp.payment_id, "1001");
        assert!(!resp.qr_code_base64.is_empty());
        assert!(!resp.qr_code.is_empty());
        // expires_at lands 7 minutes out, within a second of tolerance
        let expected = before + 7 * 60 * 1000;
        assert!((resp.expires_at - expected).abs() < 1_000);

        let record = state.store.get("1001").await.unwrap();
        assert_eq!(record.order_id, "ORD1");
        assert_eq!(record.status.as_str(), "pending");
    }

    #[tokio::test]
    async fn create_charge_rejects_bad_amount() {
        let state = test_state(MockGateway::new("1001"));

        for body in [
            create_body(None, Some("ORD1")),
            create_body(Some(0.0), Some("ORD1")),
            create_body(Some(-5.0), Some("ORD1")),
        ] {
            let err = create_charge(State(state.clone()), Json(body))
                .await
                .unwrap_err();
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        // No record was seeded
        assert!(state.store.get("1001").await.is_none());
    }

    #[tokio::test]
    async fn create_charge_requires_order_id() {
        let state = test_state(MockGateway::new("1001"));

        for body in [create_body(Some(10.0), None), create_body(Some(10.0), Some(""))] {
            let err = create_charge(State(state.clone()), Json(body))
                .await
                .unwrap_err();
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_as_500_without_record() {
        let state = test_state(MockGateway::new("1001").failing_create());

        let err = create_charge(
            State(state.clone()),
            Json(create_body(Some(10.5), Some("ORD1"))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.store.get("1001").await.is_none());
    }

    #[tokio::test]
    async fn poll_unknown_id_reports_not_found() {
        let state = test_state(MockGateway::new("1001"));

        let Json(resp) =
            check_payment_status(State(state), Path("garbage".to_string())).await;
        assert_eq!(resp.status, "not_found");
        assert!(resp.order_id.is_none());
    }

    #[tokio::test]
    async fn webhook_is_acknowledged_even_when_processing_fails() {
        let state = test_state(MockGateway::new("1001").failing_lookup());
        state.store.insert("1001", "ORD1").await.unwrap();

        let (status, _) = handle_webhook(
            State(state.clone()),
            Bytes::from_static(br#"{"type":"payment","data":{"id":"1001"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            handle_webhook(State(state), Bytes::from_static(b"not json")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_for_unknown_id_creates_nothing() {
        let state = test_state(MockGateway::new("1001").with_status("approved"));

        let (status, _) = handle_webhook(
            State(state.clone()),
            Bytes::from_static(br#"{"type":"payment","data":{"id":"1001"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.store.get("1001").await.is_none());
    }

    #[tokio::test]
    async fn pending_charge_expires_on_poll() {
        let mut state = test_state(MockGateway::new("1001"));
        state.store = Arc::new(MemoryChargeStore::new().with_expiry(Duration::from_millis(50)));
        state.store.insert("1001", "ORD1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let Json(resp) =
            check_payment_status(State(state.clone()), Path("1001".to_string())).await;
        assert_eq!(resp.status, "expired");

        let Json(resp) = check_payment_status(State(state), Path("1001".to_string())).await;
        assert_eq!(resp.status, "expired");
    }

    #[tokio::test]
    async fn create_poll_webhook_poll_scenario() {
        let state = test_state(MockGateway::new("1001").with_status("approved"));

        let Json(created) = create_charge(
            State(state.clone()),
            Json(create_body(Some(10.5), Some("ORD1"))),
        )
        .await
        .unwrap();
        assert_eq!(created.payment_id, "1001");

        let Json(polled) =
            check_payment_status(State(state.clone()), Path("1001".to_string())).await;
        assert_eq!(polled.status, "pending");
        assert_eq!(polled.order_id.as_deref(), Some("ORD1"));

        let (status, _) = handle_webhook(
            State(state.clone()),
            Bytes::from_static(br#"{"type":"payment","data":{"id":"1001"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let Json(polled) =
            check_payment_status(State(state), Path("1001".to_string())).await;
        assert_eq!(polled.status, "approved");
        assert_eq!(polled.order_id.as_deref(), Some("ORD1"));
    }

    #[tokio::test]
    async fn approved_survives_expiry_window() {
        let mut state = test_state(MockGateway::new("1001").with_status("approved"));
        state.store = Arc::new(MemoryChargeStore::new().with_expiry(Duration::from_millis(50)));

        create_charge(
            State(state.clone()),
            Json(create_body(Some(10.5), Some("ORD1"))),
        )
        .await
        .unwrap();

        handle_webhook(
            State(state.clone()),
            Bytes::from_static(br#"{"type":"payment","data":{"id":"1001"}}"#),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        let Json(polled) = check_payment_status(State(state), Path("1001".to_string())).await;
        assert_eq!(polled.status, "approved");
    }
}
