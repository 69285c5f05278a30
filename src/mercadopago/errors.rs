// Mercado Pago error types and HTTP mappings

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Mercado Pago REST error envelope: { message, error, status, cause }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpErrorEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<serde_json::Value>,
}

impl MpErrorEnvelope {
    pub fn into_api_error(self, http_status: Option<u16>) -> GatewayError {
        GatewayError::Api {
            message: self.message,
            error: self.error,
            status: http_status.or(self.status),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("mercadopago error: status={status:?} error={error:?} message={message:?}")]
    Api {
        message: Option<String>,
        error: Option<String>,
        status: Option<u16>,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("charge already registered: {0}")]
    AlreadyExists(String),
}

// Webhook-specific errors. Processing failures never change the HTTP
// acknowledgment; they exist so callers can log what went wrong.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("status lookup failed: {0}")]
    Lookup(#[from] GatewayError),
}

/// Errors surfaced by the charge-creation endpoint.
#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Client-facing error body: { erro } for 400s, { erro, detalhes } for 500s.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub erro: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detalhes: Option<String>,
}

impl IntoResponse for ChargeError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ChargeError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    erro: msg,
                    detalhes: None,
                },
            ),
            ChargeError::Gateway(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    erro: "Erro ao criar pagamento".to_string(),
                    detalhes: Some(e.to_string()),
                },
            ),
            ChargeError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    erro: "Erro ao registrar pagamento".to_string(),
                    detalhes: Some(e.to_string()),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_partial_bodies() {
        let env: MpErrorEnvelope =
            serde_json::from_str(r#"{"message":"invalid token","status":401}"#).unwrap();
        let err = env.into_api_error(Some(401));
        assert!(matches!(err, GatewayError::Api { status: Some(401), .. }));
    }

    #[test]
    fn validation_maps_to_400() {
        let resp = ChargeError::Validation("Valor inválido".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_maps_to_500() {
        let resp =
            ChargeError::Gateway(GatewayError::Http("connection refused".to_string()))
                .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
