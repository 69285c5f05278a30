// In-memory charge tracking keyed by gateway payment id

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::mercadopago::errors::StoreError;
use crate::mercadopago::types::ChargeStatus;

const DEFAULT_PAYMENT_EXPIRY: Duration = Duration::from_secs(7 * 60);

/// One record per charge created through the gateway.
#[derive(Debug, Clone)]
pub struct ChargeRecord {
    pub payment_id: String,
    pub order_id: String,
    pub status: ChargeStatus,
    created_at: Instant,
}

impl ChargeRecord {
    fn new(payment_id: String, order_id: String) -> Self {
        Self {
            payment_id,
            order_id,
            status: ChargeStatus::Pending,
            created_at: Instant::now(),
        }
    }

    fn is_past_expiry(&self, expiry: Duration) -> bool {
        self.created_at.elapsed() > expiry
    }
}

/// Result of a requested status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed.
    Applied,
    /// Record exists but the update was a no-op or would move a terminal
    /// record backwards.
    Ignored,
    /// No record for this payment id.
    Unknown,
}

/// Pluggable status store so handlers stay independent of the backing
/// storage. The in-memory implementation below stands in for a real
/// datastore and does not survive restarts.
#[async_trait]
pub trait ChargeStore: Send + Sync {
    /// Register a freshly created charge as `Pending`.
    async fn insert(&self, payment_id: &str, order_id: &str) -> Result<(), StoreError>;

    /// Snapshot of a record without expiration side effects.
    async fn get(&self, payment_id: &str) -> Option<ChargeRecord>;

    /// Forward-only status update. Terminal records never move again.
    async fn apply_transition(&self, payment_id: &str, status: ChargeStatus) -> TransitionOutcome;

    /// Snapshot for the polling path: a `Pending` record past its expiry
    /// window is reclassified as `Expired` before being returned.
    async fn status_for_poll(&self, payment_id: &str) -> Option<ChargeRecord>;
}

pub struct MemoryChargeStore {
    records: RwLock<HashMap<String, ChargeRecord>>,
    payment_expiry: Duration,
}

impl MemoryChargeStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            payment_expiry: DEFAULT_PAYMENT_EXPIRY,
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.payment_expiry = expiry;
        self
    }
}

impl Default for MemoryChargeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChargeStore for MemoryChargeStore {
    async fn insert(&self, payment_id: &str, order_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(payment_id) {
            return Err(StoreError::AlreadyExists(payment_id.to_string()));
        }
        records.insert(
            payment_id.to_string(),
            ChargeRecord::new(payment_id.to_string(), order_id.to_string()),
        );
        info!(
            payment_id = %payment_id,
            order_id = %order_id,
            "Registered charge with initial status pending"
        );
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Option<ChargeRecord> {
        let records = self.records.read().await;
        records.get(payment_id).cloned()
    }

    async fn apply_transition(&self, payment_id: &str, status: ChargeStatus) -> TransitionOutcome {
        let mut records = self.records.write().await;
        let record = match records.get_mut(payment_id) {
            Some(r) => r,
            None => {
                warn!(
                    payment_id = %payment_id,
                    status = %status,
                    "Dropping status update for unknown charge"
                );
                return TransitionOutcome::Unknown;
            }
        };

        if record.status == status {
            debug!(payment_id = %payment_id, status = %status, "Status unchanged");
            return TransitionOutcome::Ignored;
        }
        if record.status.is_terminal() {
            warn!(
                payment_id = %record.payment_id,
                current = %record.status,
                requested = %status,
                "Ignoring update that would move a terminal charge"
            );
            return TransitionOutcome::Ignored;
        }

        record.status = status;
        info!(
            payment_id = %payment_id,
            order_id = %record.order_id,
            status = %status,
            "Charge status updated"
        );
        TransitionOutcome::Applied
    }

    async fn status_for_poll(&self, payment_id: &str) -> Option<ChargeRecord> {
        // Lazy expiration runs under the write lock so a racing webhook
        // update cannot interleave with the check-then-set.
        let mut records = self.records.write().await;
        let record = records.get_mut(payment_id)?;
        if record.status == ChargeStatus::Pending && record.is_past_expiry(self.payment_expiry) {
            record.status = ChargeStatus::Expired;
            info!(payment_id = %payment_id, "Charge expired (detected on poll)");
        }
        Some(record.clone())
    }
}
