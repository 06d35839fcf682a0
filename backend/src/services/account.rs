//! Account service: derived balances, ledger history and staff deposits
//!
//! The ledger is append-only. Balances come from the `account_balances` view
//! (a sum over entries); nothing here ever updates or deletes an entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::{running_history, split_deposit, DEFAULT_DEPOSIT_DESCRIPTION};
use shared::models::{AccountBalance, AccountEntry, HistoryEntry, ShortageContribution, User, UserRole};
use shared::types::cents_to_eur;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::find_user;
use crate::services::notification::{deposit_confirmation_email, DepositNotice, Notifier};

/// Entries returned by the caller's own history view
pub const MY_HISTORY_LIMIT: usize = 50;

const CONTRIBUTION_DESCRIPTION: &str = "Shortage contribution";

/// Account service
#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
    notifier: Notifier,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    user_id: Uuid,
    amount_cents: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for AccountEntry {
    fn from(row: EntryRow) -> Self {
        AccountEntry {
            id: row.id,
            user_id: row.user_id,
            amount_cents: row.amount_cents,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: String,
    balance_cents: i64,
}

impl TryFrom<BalanceRow> for AccountBalance {
    type Error = AppError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| AppError::Internal(format!("Corrupt user {}: {}", row.id, e)))?;

        Ok(AccountBalance {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            balance_cents: row.balance_cents,
            balance_eur: cents_to_eur(row.balance_cents),
        })
    }
}

#[derive(Debug, FromRow)]
struct ContributionRow {
    id: Uuid,
    user_id: Uuid,
    amount_cents: i64,
    description: Option<String>,
    recorded_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ContributionRow> for ShortageContribution {
    fn from(row: ContributionRow) -> Self {
        ShortageContribution {
            id: row.id,
            user_id: row.user_id,
            amount_cents: row.amount_cents,
            description: row.description,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
        }
    }
}

const BALANCES: &str = r#"
    SELECT u.id, u.email, u.name, u.role, ab.balance_cents
    FROM users u
    JOIN account_balances ab ON ab.user_id = u.id
"#;

/// Input for a staff-recorded deposit
#[derive(Debug, Deserialize)]
pub struct DepositInput {
    pub user_id: Uuid,
    /// Total cash handed over
    pub amount_cents: i64,
    pub note: Option<String>,
    /// Part of the cash going towards the collective shortage
    pub contribution_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub user_id: Uuid,
    pub user_email: String,
    pub total_paid_cents: i64,
    /// Amount credited to the user's own account
    pub amount_cents: i64,
    pub amount_eur: Decimal,
    pub description: String,
    pub contribution_cents: i64,
    pub contribution_eur: Decimal,
    pub entry: AccountEntry,
    pub contribution: Option<ShortageContribution>,
    pub previous_balance_cents: i64,
    pub new_balance_cents: i64,
    pub new_balance_eur: Decimal,
}

/// Append one ledger line
pub(crate) async fn append_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount_cents: i64,
    description: Option<&str>,
) -> AppResult<AccountEntry> {
    let row = sqlx::query_as::<_, EntryRow>(
        r#"
        INSERT INTO account_entries (user_id, amount_cents, description)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, amount_cents, description, created_at
        "#,
    )
    .bind(user_id)
    .bind(amount_cents)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Current balance: the sum of every entry of the user
pub(crate) async fn balance_of(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    let balance = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM account_entries WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

impl AccountService {
    /// Create a new AccountService instance
    pub fn new(db: PgPool, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    /// Staff see everyone, lowest balance first; others only themselves
    pub async fn balances(&self, user_id: Uuid, role: UserRole) -> AppResult<Vec<AccountBalance>> {
        if role == UserRole::OfficeAssistant {
            return self.query_balances("ORDER BY ab.balance_cents ASC, u.email ASC").await;
        }
        Ok(vec![self.balance(user_id).await?])
    }

    pub async fn balance(&self, user_id: Uuid) -> AppResult<AccountBalance> {
        sqlx::query_as::<_, BalanceRow>(&format!("{} WHERE u.id = $1", BALANCES))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?
            .try_into()
    }

    /// Users in debt, most indebted first
    pub async fn debtors(&self) -> AppResult<Vec<AccountBalance>> {
        self.query_balances("WHERE ab.balance_cents < 0 ORDER BY ab.balance_cents ASC, u.email ASC")
            .await
    }

    /// Users whose balance is strictly below `threshold_cents`
    pub async fn below_threshold(&self, threshold_cents: i64) -> AppResult<Vec<AccountBalance>> {
        sqlx::query_as::<_, BalanceRow>(&format!(
            "{} WHERE ab.balance_cents < $1 ORDER BY ab.balance_cents ASC",
            BALANCES
        ))
        .bind(threshold_cents)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(AccountBalance::try_from)
        .collect()
    }

    /// Every user with their balance, by email
    pub async fn users(&self) -> AppResult<Vec<AccountBalance>> {
        self.query_balances("ORDER BY u.email ASC").await
    }

    async fn query_balances(&self, tail: &str) -> AppResult<Vec<AccountBalance>> {
        sqlx::query_as::<_, BalanceRow>(&format!("{} {}", BALANCES, tail))
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(AccountBalance::try_from)
            .collect()
    }

    /// Ledger of a user, newest first, each line with the balance right after it
    pub async fn history(&self, user_id: Uuid, limit: Option<usize>) -> AppResult<Vec<HistoryEntry>> {
        let mut conn = self.db.acquire().await?;
        find_user(&mut conn, user_id).await?;

        let entries: Vec<AccountEntry> = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, user_id, amount_cents, description, created_at
            FROM account_entries
            WHERE user_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(AccountEntry::from)
        .collect();

        let mut history = running_history(&entries);
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        Ok(history)
    }

    /// Record cash handed to staff.
    ///
    /// The part not earmarked as shortage contribution is credited to the
    /// user's ledger; the contribution is recorded separately. A confirmation
    /// email goes out after commit and never fails the deposit.
    pub async fn deposit(&self, staff_id: Uuid, input: DepositInput) -> AppResult<DepositReceipt> {
        let split = split_deposit(input.amount_cents, input.contribution_cents.unwrap_or(0))?;
        let description = input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_DEPOSIT_DESCRIPTION)
            .to_string();

        let mut tx = self.db.begin().await?;

        let user: User = find_user(&mut tx, input.user_id).await?;
        let previous_balance_cents = balance_of(&mut tx, user.id).await?;

        let entry = append_entry(&mut tx, user.id, split.account_cents, Some(&description)).await?;

        let contribution = if split.contribution_cents > 0 {
            let row = sqlx::query_as::<_, ContributionRow>(
                r#"
                INSERT INTO shortage_contributions (user_id, amount_cents, description, recorded_by)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, amount_cents, description, recorded_by, created_at
                "#,
            )
            .bind(user.id)
            .bind(split.contribution_cents)
            .bind(CONTRIBUTION_DESCRIPTION)
            .bind(staff_id)
            .fetch_one(&mut *tx)
            .await?;
            Some(ShortageContribution::from(row))
        } else {
            None
        };

        let new_balance_cents = balance_of(&mut tx, user.id).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            staff_id = %staff_id,
            amount_cents = input.amount_cents,
            account_cents = split.account_cents,
            contribution_cents = split.contribution_cents,
            new_balance_cents,
            "Deposit recorded"
        );

        let notice = DepositNotice {
            email: user.email.clone(),
            name: user.name.clone(),
            total_paid_cents: input.amount_cents,
            deposited_cents: split.account_cents,
            contribution_cents: split.contribution_cents,
            previous_balance_cents,
            new_balance_cents,
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&deposit_confirmation_email(&notice)).await {
                tracing::warn!(email = %notice.email, "Failed to send deposit confirmation: {}", e);
            }
        });

        Ok(DepositReceipt {
            user_id: user.id,
            user_email: user.email,
            total_paid_cents: input.amount_cents,
            amount_cents: split.account_cents,
            amount_eur: cents_to_eur(split.account_cents),
            description,
            contribution_cents: split.contribution_cents,
            contribution_eur: cents_to_eur(split.contribution_cents),
            entry,
            contribution,
            previous_balance_cents,
            new_balance_cents,
            new_balance_eur: cents_to_eur(new_balance_cents),
        })
    }
}
