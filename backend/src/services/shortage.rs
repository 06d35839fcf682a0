//! Shortage attribution service
//!
//! Loads reconciliation shortages and hands them to the shared attribution
//! rules. Shortages are valued at each product's current regular price.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{ShortageAcknowledgement, ShortageEvent, ShortageSummary, ShortageWarning};
use shared::shortage::{build_warning, global_shortage_cents, lifetime_units_lost, summarize, warning_cutoff};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::auth::find_user;

/// Shortage service
#[derive(Clone)]
pub struct ShortageService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ShortageEventRow {
    adjustment_id: Uuid,
    product_name: String,
    difference: i64,
    unit_price_cents: i64,
    is_write_off: bool,
    created_at: DateTime<Utc>,
}

impl From<ShortageEventRow> for ShortageEvent {
    fn from(row: ShortageEventRow) -> Self {
        ShortageEvent {
            adjustment_id: row.adjustment_id,
            product_name: row.product_name,
            difference: row.difference,
            unit_price_cents: row.unit_price_cents,
            is_write_off: row.is_write_off,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AcknowledgementRow {
    user_id: Uuid,
    acknowledged_at: DateTime<Utc>,
    shortage_total: i64,
}

impl From<AcknowledgementRow> for ShortageAcknowledgement {
    fn from(row: AcknowledgementRow) -> Self {
        ShortageAcknowledgement {
            user_id: row.user_id,
            acknowledged_at: row.acknowledged_at,
            shortage_total: row.shortage_total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcknowledgeResponse {
    pub acknowledged_at: DateTime<Utc>,
    pub shortage_total: i64,
}

/// Every negative adjustment recorded after `since`, write-offs included.
/// The shared rules decide which of them count as shortage.
async fn loss_events(
    conn: &mut PgConnection,
    since: Option<DateTime<Utc>>,
) -> AppResult<Vec<ShortageEvent>> {
    let rows = sqlx::query_as::<_, ShortageEventRow>(
        r#"
        SELECT sa.id AS adjustment_id, p.name AS product_name, sa.difference,
               p.price_cents AS unit_price_cents, sa.is_write_off, sa.created_at
        FROM stock_adjustments sa
        JOIN products p ON p.id = sa.product_id
        WHERE sa.difference < 0
          AND ($1::TIMESTAMPTZ IS NULL OR sa.created_at > $1)
        ORDER BY sa.created_at DESC
        "#,
    )
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(ShortageEvent::from).collect())
}

impl ShortageService {
    /// Create a new ShortageService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn acknowledgement(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Option<ShortageAcknowledgement>> {
        let row = sqlx::query_as::<_, AcknowledgementRow>(
            r#"
            SELECT user_id, acknowledged_at, shortage_total
            FROM shortage_acknowledgements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(ShortageAcknowledgement::from))
    }

    /// Shortages the user has not yet seen: after they joined and after their
    /// last acknowledgement
    pub async fn warning_for(&self, user_id: Uuid) -> AppResult<ShortageWarning> {
        let mut conn = self.db.acquire().await?;

        let user = find_user(&mut conn, user_id).await?;
        let acknowledged_at = Self::acknowledgement(&mut conn, user_id)
            .await?
            .map(|a| a.acknowledged_at);

        let cutoff = warning_cutoff(user.created_at, acknowledged_at);
        let events = loss_events(&mut conn, Some(cutoff)).await?;

        Ok(build_warning(&events, cutoff, acknowledged_at))
    }

    /// Move the user's cutoff to now.
    ///
    /// The stored total is every unit ever lost, write-offs included, not
    /// the user's own share.
    pub async fn acknowledge(&self, user_id: Uuid) -> AppResult<AcknowledgeResponse> {
        let mut conn = self.db.acquire().await?;

        let events = loss_events(&mut conn, None).await?;
        let shortage_total = lifetime_units_lost(&events);

        let row = sqlx::query_as::<_, AcknowledgementRow>(
            r#"
            INSERT INTO shortage_acknowledgements (user_id, acknowledged_at, shortage_total)
            VALUES ($1, NOW(), $2)
            ON CONFLICT (user_id) DO UPDATE
                SET acknowledged_at = EXCLUDED.acknowledged_at,
                    shortage_total = EXCLUDED.shortage_total
            RETURNING user_id, acknowledged_at, shortage_total
            "#,
        )
        .bind(user_id)
        .bind(shortage_total)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(user_id = %user_id, shortage_total, "Shortage acknowledged");

        Ok(AcknowledgeResponse {
            acknowledged_at: row.acknowledged_at,
            shortage_total: row.shortage_total,
        })
    }

    /// Lifetime shortage value net of all contributions (staff)
    pub async fn summary(&self) -> AppResult<ShortageSummary> {
        let mut conn = self.db.acquire().await?;

        let events = loss_events(&mut conn, None).await?;
        let total_contributions_cents = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM shortage_contributions",
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(summarize(global_shortage_cents(&events), total_contributions_cents))
    }
}
