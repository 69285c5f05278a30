// Mercado Pago REST client
// Implements the two payments endpoints the charge flow needs, with bearer
// auth and idempotency-key propagation on creation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::mercadopago::errors::{GatewayError, MpErrorEnvelope};
use crate::mercadopago::types::{
    CreateChargeRequest, CreatePaymentBody, CreatedCharge, Payer, Payment,
};
use crate::mercadopago::PixGateway;

pub const MP_API_BASE: &str = "https://api.mercadopago.com";

#[derive(Clone)]
pub struct MercadoPagoRestClient {
    pub(crate) http: Client,
    pub(crate) access_token: String,
    pub(crate) api_base: String,
    pub(crate) payer: Payer,
}

impl MercadoPagoRestClient {
    pub fn new(http: Client, access_token: String, payer: Payer) -> Self {
        Self {
            http,
            access_token,
            api_base: MP_API_BASE.to_string(),
            payer,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn apply_common_headers(
        &self,
        req: reqwest::RequestBuilder,
        idempotency_key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = req.bearer_auth(&self.access_token);
        if let Some(k) = idempotency_key {
            req = req.header("X-Idempotency-Key", k);
        }
        req
    }

    fn map_error(status: StatusCode, body: &str) -> GatewayError {
        if let Ok(env) = serde_json::from_str::<MpErrorEnvelope>(body) {
            env.into_api_error(Some(status.as_u16()))
        } else {
            GatewayError::Http(format!("status={} body={}", status.as_u16(), body))
        }
    }

    // POST /v1/payments
    #[instrument(skip(self, body), fields(method = "POST", path = "/v1/payments"))]
    pub async fn create_payment(&self, body: CreatePaymentBody) -> Result<Payment, GatewayError> {
        // One key per creation attempt; the caller does not retry.
        let idempotency_key = Uuid::new_v4().to_string();

        info!(
            target: "mercadopago",
            method = "POST",
            path = "/v1/payments",
            transaction_amount = body.transaction_amount,
            idempotency_key = %idempotency_key,
            "mercadopago request"
        );

        let url = format!("{}/v1/payments", self.api_base);
        let req = self.http.post(url).json(&body);
        let req = self.apply_common_headers(req, Some(&idempotency_key));

        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        if status.is_success() {
            serde_json::from_str::<Payment>(&text).map_err(|e| GatewayError::Decode(e.to_string()))
        } else {
            Err(Self::map_error(status, &text))
        }
    }

    // GET /v1/payments/{id}
    #[instrument(skip(self), fields(method = "GET", path = "/v1/payments/{id}", payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, GatewayError> {
        info!(
            target: "mercadopago",
            method = "GET",
            path = "/v1/payments/{id}",
            payment_id = %payment_id,
            "mercadopago request"
        );

        let url = format!("{}/v1/payments/{}", self.api_base, payment_id);
        let req = self.http.get(url);
        let req = self.apply_common_headers(req, None);

        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        if status.is_success() {
            serde_json::from_str::<Payment>(&text).map_err(|e| GatewayError::Decode(e.to_string()))
        } else {
            Err(Self::map_error(status, &text))
        }
    }
}

#[async_trait]
impl PixGateway for MercadoPagoRestClient {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    async fn create_charge(
        &self,
        charge: CreateChargeRequest,
    ) -> Result<CreatedCharge, GatewayError> {
        let payment = self
            .create_payment(CreatePaymentBody {
                transaction_amount: charge.amount,
                description: charge.description,
                payment_method_id: "pix".to_string(),
                payer: self.payer.clone(),
                date_of_expiration: charge.date_of_expiration,
            })
            .await?;

        let qr = payment
            .point_of_interaction
            .ok_or_else(|| {
                GatewayError::Decode("payment response missing point_of_interaction".to_string())
            })?
            .transaction_data;

        Ok(CreatedCharge {
            payment_id: payment.id.to_string(),
            qr_code_base64: qr.qr_code_base64,
            qr_code: qr.qr_code,
        })
    }

    async fn payment_status(&self, payment_id: &str) -> Result<String, GatewayError> {
        let payment = self.get_payment(payment_id).await?;
        Ok(payment.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_error_body_becomes_http_error() {
        let err = MercadoPagoRestClient::map_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(matches!(err, GatewayError::Http(_)));
    }

    #[test]
    fn envelope_error_body_becomes_api_error() {
        let err = MercadoPagoRestClient::map_error(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"invalid access token","error":"unauthorized","status":401}"#,
        );
        assert!(matches!(err, GatewayError::Api { status: Some(401), .. }));
    }
}
