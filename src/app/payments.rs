use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use ulid::Ulid;
use uuid::Uuid;

use crate::domain::payment::{DonorTotal, PaymentOrder, PaymentStatus};
use crate::infra::db::Db;
use crate::infra::payments::{GatewayOrder, PaymentGateway};

#[derive(Clone)]
pub struct PaymentService {
    db: Db,
    gateway: PaymentGateway,
}

/// Outcome of a signature verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Signature checked out and the order is now marked paid.
    Verified,
    /// Signature did not match the order/payment pair.
    BadSignature,
    /// No order with that provider id exists locally.
    UnknownOrder,
}

impl PaymentService {
    pub fn new(db: Db, gateway: PaymentGateway) -> Self {
        Self { db, gateway }
    }

    /// Create an order at the provider and record it locally. Gateway
    /// failures surface as `GatewayError` inside the anyhow chain so the
    /// handler can map provider rejections to their original status.
    pub async fn create_order(
        &self,
        created_by: Option<Uuid>,
        amount: i64,
        currency: &str,
    ) -> Result<GatewayOrder> {
        let receipt = format!("rcpt_{}", Ulid::new());
        let order = self.gateway.create_order(amount, currency, &receipt).await?;

        sqlx::query(
            "INSERT INTO payment_orders (provider_order_id, receipt, amount, currency, status, created_by) \
             VALUES ($1, $2, $3, $4, 'created', $5)",
        )
        .bind(&order.id)
        .bind(&order.receipt)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(created_by)
        .execute(self.db.pool())
        .await?;

        Ok(order)
    }

    /// Verify a captured payment's signature and mark the order paid.
    pub async fn verify_payment(
        &self,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerifyOutcome> {
        if !self
            .gateway
            .verify_payment_signature(provider_order_id, payment_id, signature)
        {
            return Ok(VerifyOutcome::BadSignature);
        }

        let result = sqlx::query(
            "UPDATE payment_orders SET status = 'paid', payment_id = $2 \
             WHERE provider_order_id = $1",
        )
        .bind(provider_order_id)
        .bind(payment_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(VerifyOutcome::Verified)
        } else {
            Ok(VerifyOutcome::UnknownOrder)
        }
    }

    pub async fn get_order(&self, provider_order_id: &str) -> Result<Option<PaymentOrder>> {
        let row = sqlx::query(
            "SELECT id, provider_order_id, receipt, amount, currency, status, \
                    payment_id, created_by, created_at \
             FROM payment_orders WHERE provider_order_id = $1",
        )
        .bind(provider_order_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_order(&row)).transpose()
    }

    /// Donor leaderboard over paid orders attributed to a profile.
    pub async fn top_donors(&self, limit: i64) -> Result<Vec<DonorTotal>> {
        let rows = sqlx::query(
            "SELECT o.created_by AS profile_id, p.handle, p.full_name, \
                    SUM(o.amount)::bigint AS total_paid, COUNT(*) AS payment_count \
             FROM payment_orders o \
             JOIN profiles p ON p.id = o.created_by \
             WHERE o.status = 'paid' AND o.created_by IS NOT NULL \
             GROUP BY o.created_by, p.handle, p.full_name \
             ORDER BY total_paid DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut donors = Vec::with_capacity(rows.len());
        for row in rows {
            donors.push(DonorTotal {
                profile_id: row.get("profile_id"),
                handle: row.get("handle"),
                full_name: row.get("full_name"),
                total_paid: row.get("total_paid"),
                payment_count: row.get("payment_count"),
            });
        }

        Ok(donors)
    }
}

fn read_order(row: &PgRow) -> Result<PaymentOrder> {
    let status: String = row.get("status");
    let status = PaymentStatus::from_db(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown payment status: {}", status))?;
    Ok(PaymentOrder {
        id: row.get("id"),
        provider_order_id: row.get("provider_order_id"),
        receipt: row.get("receipt"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status,
        payment_id: row.get("payment_id"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    })
}
