// Webhook notification processing.
// The HTTP layer always acknowledges with 200; errors returned here are for
// logging only. The gateway re-delivers indefinitely when not acknowledged.

use tracing::{info, instrument, warn};

use crate::mercadopago::charge_store::{ChargeStore, TransitionOutcome};
use crate::mercadopago::errors::WebhookError;
use crate::mercadopago::types::{map_gateway_status, WebhookNotification};
use crate::mercadopago::PixGateway;
use crate::mp_counter_inc;

/// Parse a notification and reconcile the referenced charge against the
/// gateway's authoritative status.
#[instrument(skip(payload, gateway, store))]
pub async fn process_notification(
    payload: &[u8],
    gateway: &dyn PixGateway,
    store: &dyn ChargeStore,
) -> Result<(), WebhookError> {
    let note: WebhookNotification = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::MalformedPayload(format!("JSON parse error: {}", e)))?;

    mp_counter_inc!("mp.webhook.received", "type" => note.kind.as_deref().unwrap_or("none"));

    let payment_id = match (&note.kind, note.data.as_ref().and_then(|d| d.id.clone())) {
        (Some(kind), Some(id)) if kind == "payment" => id,
        _ => {
            info!(
                kind = note.kind.as_deref().unwrap_or("none"),
                "Ignoring non-payment notification"
            );
            mp_counter_inc!("mp.webhook.ignored");
            return Ok(());
        }
    };

    info!(payment_id = %payment_id, "Received payment notification");

    // Re-fetch the authoritative status; the notification itself carries
    // only the payment id. On failure the local record stays untouched.
    let raw_status = gateway.payment_status(&payment_id).await?;
    let status = map_gateway_status(&raw_status);

    match store.apply_transition(&payment_id, status).await {
        TransitionOutcome::Applied => {
            info!(
                payment_id = %payment_id,
                gateway_status = %raw_status,
                status = %status,
                "Charge reconciled from webhook"
            );
            mp_counter_inc!("mp.webhook.processed", "status" => status.as_str());
        }
        TransitionOutcome::Ignored => {
            info!(
                payment_id = %payment_id,
                gateway_status = %raw_status,
                "Webhook update had no effect"
            );
        }
        TransitionOutcome::Unknown => {
            // The charge may not be registered yet when notifications race
            // the creation response. No buffering; the next poll or webhook
            // catches up.
            warn!(
                payment_id = %payment_id,
                "Webhook for unknown charge; dropping"
            );
            mp_counter_inc!("mp.webhook.unknown_charge");
        }
    }

    Ok(())
}
