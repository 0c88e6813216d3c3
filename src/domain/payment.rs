use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Local record of an order created at the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: Uuid,
    pub provider_order_id: String,
    pub receipt: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_id: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
}

impl PaymentStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
        }
    }
}

/// Aggregated paid total per profile, for the donor leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct DonorTotal {
    pub profile_id: Uuid,
    pub handle: String,
    pub full_name: String,
    pub total_paid: i64,
    pub payment_count: i64,
}
