// Minimal Mercado Pago DTOs and helper types
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Local lifecycle of a charge. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Expired,
}

impl ChargeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Approved => "approved",
            ChargeStatus::Rejected => "rejected",
            ChargeStatus::Cancelled => "cancelled",
            ChargeStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ChargeStatus::Pending)
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw gateway status onto the local lifecycle. Anything the gateway
/// reports besides the three recognized outcomes (`in_process`, `authorized`,
/// ...) counts as still pending.
pub fn map_gateway_status(raw: &str) -> ChargeStatus {
    match raw {
        "approved" => ChargeStatus::Approved,
        "rejected" => ChargeStatus::Rejected,
        "cancelled" => ChargeStatus::Cancelled,
        _ => ChargeStatus::Pending,
    }
}

// Gateway-facing request/response shapes used at the PixGateway seam

#[derive(Debug, Clone)]
pub struct CreateChargeRequest {
    pub amount: f64,
    pub description: String,
    /// ISO-8601 with explicit offset, as the payments API expects.
    pub date_of_expiration: String,
}

#[derive(Debug, Clone)]
pub struct CreatedCharge {
    pub payment_id: String,
    pub qr_code_base64: String,
    pub qr_code: String,
}

// Mercado Pago REST DTOs (subset)

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentBody {
    pub transaction_amount: f64,
    pub description: String,
    pub payment_method_id: String,
    pub payer: Payer,
    pub date_of_expiration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Payment resource as returned by both create and retrieve calls.
/// `point_of_interaction` is only populated for Pix payments.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointOfInteraction {
    pub transaction_data: TransactionData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    pub qr_code_base64: String,
    pub qr_code: String,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

// Webhook notification envelope. The gateway posts
// { "type": "payment", "data": { "id": ... } } where `id` shows up as a JSON
// string or number depending on the notification channel.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    #[serde(default, deserialize_with = "id_string_or_number")]
    pub id: Option<String>,
}

fn id_string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Format an expiration instant the way the payments API wants it:
/// ISO-8601 with milliseconds and the BRT (-03:00) offset.
pub fn format_brt_expiration(at: DateTime<Utc>) -> String {
    let brt = FixedOffset::west_opt(3 * 3600).expect("UTC-3 is a valid offset");
    at.with_timezone(&brt)
        .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_status_mapping() {
        assert_eq!(map_gateway_status("approved"), ChargeStatus::Approved);
        assert_eq!(map_gateway_status("rejected"), ChargeStatus::Rejected);
        assert_eq!(map_gateway_status("cancelled"), ChargeStatus::Cancelled);
        // Intermediate statuses stay pending locally
        assert_eq!(map_gateway_status("in_process"), ChargeStatus::Pending);
        assert_eq!(map_gateway_status("authorized"), ChargeStatus::Pending);
        assert_eq!(map_gateway_status(""), ChargeStatus::Pending);
    }

    #[test]
    fn webhook_id_accepts_string_and_number() {
        let note: WebhookNotification =
            serde_json::from_str(r#"{"type":"payment","data":{"id":"12345"}}"#).unwrap();
        assert_eq!(note.data.unwrap().id.as_deref(), Some("12345"));

        let note: WebhookNotification =
            serde_json::from_str(r#"{"type":"payment","data":{"id":12345}}"#).unwrap();
        assert_eq!(note.data.unwrap().id.as_deref(), Some("12345"));
    }

    #[test]
    fn webhook_tolerates_missing_fields() {
        let note: WebhookNotification = serde_json::from_str(r#"{}"#).unwrap();
        assert!(note.kind.is_none());
        assert!(note.data.is_none());
    }

    #[test]
    fn brt_expiration_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_brt_expiration(at), "2025-03-01T09:00:00.000-03:00");
    }
}
