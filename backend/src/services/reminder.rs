//! Debt reminder sweep
//!
//! Emails every user whose balance is below the configured threshold. Each
//! recipient is attempted on its own; one failed delivery never stops the
//! sweep.

use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::config::ReminderConfig;
use crate::error::{AppError, AppResult};
use crate::services::account::AccountService;
use crate::services::notification::{debt_reminder_email, Notifier};

/// Reminder service
#[derive(Clone)]
pub struct ReminderService {
    accounts: AccountService,
    notifier: Notifier,
    threshold_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderDelivery {
    pub email: String,
    pub balance_cents: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderReport {
    pub message: String,
    pub sent_to: Vec<ReminderDelivery>,
}

impl ReminderReport {
    fn new(sent_to: Vec<ReminderDelivery>) -> Self {
        let sent = sent_to.iter().filter(|d| d.success).count();
        Self {
            message: format!("Sent {}/{} reminders", sent, sent_to.len()),
            sent_to,
        }
    }

    pub fn sent(&self) -> usize {
        self.sent_to.iter().filter(|d| d.success).count()
    }

    pub fn failed(&self) -> usize {
        self.sent_to.len() - self.sent()
    }
}

impl ReminderService {
    /// Create a new ReminderService instance
    pub fn new(accounts: AccountService, notifier: Notifier, threshold_cents: i64) -> Self {
        Self {
            accounts,
            notifier,
            threshold_cents,
        }
    }

    pub async fn send_reminders(&self) -> AppResult<ReminderReport> {
        let debtors = self.accounts.below_threshold(self.threshold_cents).await?;

        let mut sent_to = Vec::with_capacity(debtors.len());
        for debtor in debtors {
            let message = debt_reminder_email(&debtor.email, debtor.name.as_deref(), debtor.balance_cents);
            let delivery = match self.notifier.send(&message).await {
                Ok(()) => ReminderDelivery {
                    email: debtor.email,
                    balance_cents: debtor.balance_cents,
                    success: true,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(email = %debtor.email, "Failed to send debt reminder: {}", e);
                    ReminderDelivery {
                        email: debtor.email,
                        balance_cents: debtor.balance_cents,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            sent_to.push(delivery);
        }

        let report = ReminderReport::new(sent_to);
        tracing::info!(
            threshold_cents = self.threshold_cents,
            sent = report.sent(),
            failed = report.failed(),
            "Debt reminder sweep finished"
        );
        Ok(report)
    }
}

/// The first `day` of a month at `hour`:00 UTC strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, day: u32, hour: u32) -> AppResult<DateTime<Utc>> {
    let at = |year: i32, month: u32| {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .ok_or_else(|| {
                AppError::Configuration(format!("Invalid reminder schedule: day {} hour {}", day, hour))
            })
    };

    let this_month = at(now.year(), now.month())?;
    if this_month > now {
        return Ok(this_month);
    }
    if now.month() == 12 {
        at(now.year() + 1, 1)
    } else {
        at(now.year(), now.month() + 1)
    }
}

/// Run the sweep on schedule for the lifetime of the process
pub fn spawn_scheduler(service: ReminderService, schedule: ReminderConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = match next_run_after(now, schedule.day_of_month, schedule.hour_utc) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Debt reminder scheduler stopped: {}", e);
                    return;
                }
            };
            tracing::info!(next_run = %next, "Debt reminder sweep scheduled");

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            if let Err(e) = service.send_reminders().await {
                tracing::error!("Debt reminder sweep failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_this_month() {
        let next = next_run_after(utc(2024, 3, 1, 6, 30), 1, 8).unwrap();
        assert_eq!(next, utc(2024, 3, 1, 8, 0));
    }

    #[test]
    fn test_next_run_rolls_to_next_month() {
        let next = next_run_after(utc(2024, 3, 1, 8, 0), 1, 8).unwrap();
        assert_eq!(next, utc(2024, 4, 1, 8, 0));

        let next = next_run_after(utc(2024, 3, 15, 0, 0), 1, 8).unwrap();
        assert_eq!(next, utc(2024, 4, 1, 8, 0));
    }

    #[test]
    fn test_next_run_rolls_over_year_end() {
        let next = next_run_after(utc(2024, 12, 20, 12, 0), 1, 8).unwrap();
        assert_eq!(next, utc(2025, 1, 1, 8, 0));
    }

    #[test]
    fn test_invalid_schedule_is_configuration_error() {
        let result = next_run_after(utc(2024, 3, 1, 0, 0), 1, 24);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_report_message_counts_successes() {
        let report = ReminderReport::new(vec![
            ReminderDelivery {
                email: "a@example.com".into(),
                balance_cents: -900,
                success: true,
                error: None,
            },
            ReminderDelivery {
                email: "b@example.com".into(),
                balance_cents: -600,
                success: false,
                error: Some("relay down".into()),
            },
        ]);
        assert_eq!(report.message, "Sent 1/2 reminders");
        assert_eq!(report.sent(), 1);
        assert_eq!(report.failed(), 1);
    }
}
