// Mercado Pago provider module

pub mod charge_store;
pub mod errors;
pub mod metrics;
pub mod rest;
pub mod types;
pub mod webhook;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::settings::MercadoPagoSettings;
use self::charge_store::{ChargeStore, MemoryChargeStore};
use self::errors::GatewayError;
use self::rest::MercadoPagoRestClient;
use self::types::{CreateChargeRequest, CreatedCharge, Payer};

/// Seam between the HTTP handlers and the payment processor. The live
/// implementation is the REST client; tests substitute a mock.
#[async_trait]
pub trait PixGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a Pix charge and return its id plus QR payload.
    async fn create_charge(
        &self,
        charge: CreateChargeRequest,
    ) -> Result<CreatedCharge, GatewayError>;

    /// Fetch the gateway's current status string for a payment.
    async fn payment_status(&self, payment_id: &str) -> Result<String, GatewayError>;
}

pub struct MercadoPagoProvider {
    rest: Arc<MercadoPagoRestClient>,
    charge_store: Arc<MemoryChargeStore>,
    payment_expiry: Duration,
}

impl MercadoPagoProvider {
    // Build reqwest client with rustls and timeout from cfg.
    pub fn new(cfg: MercadoPagoSettings) -> Result<Self, GatewayError> {
        let timeout = Duration::from_millis(if cfg.timeout_ms > 0 {
            cfg.timeout_ms
        } else {
            15_000
        });
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let payer = Payer {
            email: cfg.payer_email.clone(),
            first_name: cfg.payer_first_name.clone(),
            last_name: cfg.payer_last_name.clone(),
        };
        let rest = MercadoPagoRestClient::new(http, cfg.access_token.clone(), payer)
            .with_api_base(cfg.api_base.clone());

        let charge_store = Arc::new(MemoryChargeStore::new().with_expiry(cfg.payment_expiry));

        Ok(Self {
            rest: Arc::new(rest),
            charge_store,
            payment_expiry: cfg.payment_expiry,
        })
    }

    pub fn gateway(&self) -> Arc<dyn PixGateway> {
        Arc::clone(&self.rest) as Arc<dyn PixGateway>
    }

    pub fn charge_store(&self) -> Arc<dyn ChargeStore> {
        Arc::clone(&self.charge_store) as Arc<dyn ChargeStore>
    }

    pub fn payment_expiry(&self) -> Duration {
        self.payment_expiry
    }
}
