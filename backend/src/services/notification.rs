//! Email notifications
//!
//! Supports:
//! - Console transport for development (messages are only logged)
//! - Resend HTTP API
//! - MailChannels-compatible JSON relay
//!
//! Amounts arrive in integer cents and are formatted here, at the edge.

use std::sync::Arc;

use serde::Serialize;
use shared::types::format_eur;

use crate::config::{EmailConfig, EmailMode};
use crate::error::{AppError, AppResult};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_RELAY_URL: &str = "https://api.mailchannels.net/tx/v1/send";
const SIGNATURE: &str = "Bufet";

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Clone)]
enum Transport {
    Console,
    Resend { api_key: Option<String> },
    Relay { url: String },
}

/// Outgoing email dispatcher, cheap to clone into background tasks
#[derive(Clone)]
pub struct Notifier {
    transport: Transport,
    from_address: Arc<str>,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

#[derive(Serialize)]
struct RelayAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct RelayPersonalization<'a> {
    to: [RelayAddress<'a>; 1],
}

#[derive(Serialize)]
struct RelayContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    personalizations: [RelayPersonalization<'a>; 1],
    from: RelayAddress<'a>,
    subject: &'a str,
    content: [RelayContent<'a>; 2],
}

impl Notifier {
    pub fn new(config: &EmailConfig) -> Self {
        let transport = match config.mode {
            EmailMode::Console => Transport::Console,
            EmailMode::Resend => Transport::Resend {
                api_key: config.resend_api_key.clone().filter(|k| !k.is_empty()),
            },
            EmailMode::Relay => Transport::Relay {
                url: config
                    .relay_url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            },
        };

        Self {
            transport,
            from_address: Arc::from(config.from_address.as_str()),
            http_client: reqwest::Client::new(),
        }
    }

    /// Log-only notifier
    pub fn console(from_address: &str) -> Self {
        Self {
            transport: Transport::Console,
            from_address: Arc::from(from_address),
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        match &self.transport {
            Transport::Console => {
                tracing::info!(
                    to = %message.to,
                    subject = %message.subject,
                    "Email (console mode):\n{}",
                    message.text
                );
                Ok(())
            }
            Transport::Resend { api_key: None } => {
                tracing::warn!(to = %message.to, subject = %message.subject, "Resend API key missing, email skipped");
                Ok(())
            }
            Transport::Resend {
                api_key: Some(api_key),
            } => self.send_resend(api_key, message).await,
            Transport::Relay { url } => self.send_relay(url, message).await,
        }
    }

    async fn send_resend(&self, api_key: &str, message: &EmailMessage) -> AppResult<()> {
        let request = ResendRequest {
            from: &*self.from_address,
            to: [message.to.as_str()],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Resend request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!("Resend API error: {} {}", status, body)));
        }

        tracing::info!(to = %message.to, "Email sent via Resend");
        Ok(())
    }

    async fn send_relay(&self, url: &str, message: &EmailMessage) -> AppResult<()> {
        let request = RelayRequest {
            personalizations: [RelayPersonalization {
                to: [RelayAddress {
                    email: message.to.as_str(),
                }],
            }],
            from: RelayAddress {
                email: &*self.from_address,
            },
            subject: &message.subject,
            content: [
                RelayContent {
                    content_type: "text/plain",
                    value: &message.text,
                },
                RelayContent {
                    content_type: "text/html",
                    value: &message.html,
                },
            ],
        };

        let response = self
            .http_client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Relay request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!("Relay error: {} {}", status, body)));
        }

        tracing::info!(to = %message.to, "Email sent via relay");
        Ok(())
    }
}

// ============================================================================
// Message templates
// ============================================================================

fn greeting(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Ahoj {}", name),
        None => "Ahoj".to_string(),
    }
}

pub fn login_code_email(to: &str, code: &str, expiry_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("{} - Prihlasovací kód", SIGNATURE),
        text: format!(
            "Ahoj,\n\nTvoj prihlasovací kód je: {}\n\nKód je platný {} minút.",
            code, expiry_minutes
        ),
        html: format!(
            "<h2>{}</h2><p>Ahoj,</p><p>Tvoj prihlasovací kód je:</p>\
             <h1 style=\"font-size: 32px; letter-spacing: 8px;\">{}</h1>\
             <p>Kód je platný {} minút.</p>",
            SIGNATURE, code, expiry_minutes
        ),
    }
}

/// Everything a deposit confirmation shows
#[derive(Debug, Clone)]
pub struct DepositNotice {
    pub email: String,
    pub name: Option<String>,
    pub total_paid_cents: i64,
    pub deposited_cents: i64,
    pub contribution_cents: i64,
    pub previous_balance_cents: i64,
    pub new_balance_cents: i64,
}

pub fn deposit_confirmation_email(notice: &DepositNotice) -> EmailMessage {
    let greeting = greeting(notice.name.as_deref());
    let total_paid = format_eur(notice.total_paid_cents);
    let deposited = format_eur(notice.deposited_cents);
    let contribution = format_eur(notice.contribution_cents);
    let previous = format_eur(notice.previous_balance_cents);
    let new_balance = format_eur(notice.new_balance_cents);

    let mut text = vec![
        format!("{},", greeting),
        String::new(),
        "Na tvoj účet v bufete bol práve zaznamenaný vklad.".to_string(),
        String::new(),
        format!("Zaplatená suma: {}", total_paid),
    ];
    let mut html = format!(
        "<h2>{} - Potvrdenie vkladu</h2><p>{},</p>\
         <p>Na tvoj účet v bufete bol práve zaznamenaný vklad.</p>\
         <p><strong>Zaplatená suma:</strong> {}</p>",
        SIGNATURE, greeting, total_paid
    );

    if notice.contribution_cents > 0 {
        text.push(format!("  - Na účet: {}", deposited));
        text.push(format!("  - Príspevok na manko: {}", contribution));
        html.push_str(&format!(
            "<ul><li>Na účet: {}</li><li>Príspevok na manko: {}</li></ul>",
            deposited, contribution
        ));
    }

    text.push(String::new());
    text.push(format!("Predchádzajúci zostatok: {}", previous));
    text.push(format!("Nový zostatok: {}", new_balance));
    html.push_str(&format!(
        "<p>Predchádzajúci zostatok: {}</p><p><strong>Nový zostatok: {}</strong></p>",
        previous, new_balance
    ));

    if notice.new_balance_cents > 0 {
        let credit = format!("Máš kredit {} na ďalšie nákupy.", new_balance);
        text.push(String::new());
        text.push(credit.clone());
        html.push_str(&format!("<p>{}</p>", credit));
    }

    text.push(String::new());
    text.push("Ďakujeme,".to_string());
    text.push(SIGNATURE.to_string());
    html.push_str(&format!("<p>Ďakujeme,<br/>{}</p>", SIGNATURE));

    EmailMessage {
        to: notice.email.clone(),
        subject: format!("{} - Potvrdenie vkladu", SIGNATURE),
        text: text.join("\n"),
        html,
    }
}

pub fn debt_reminder_email(to: &str, name: Option<&str>, balance_cents: i64) -> EmailMessage {
    let greeting = greeting(name);
    let balance = format_eur(balance_cents);
    EmailMessage {
        to: to.to_string(),
        subject: format!("{} - Pripomienka dlhu", SIGNATURE),
        text: format!(
            "{},\n\nTvoj aktuálny zostatok v bufete je: {}\n\n\
             Nezabudni si prosím vyrovnať dlh u office asistentky.\n\nĎakujeme,\n{}",
            greeting, balance, SIGNATURE
        ),
        html: format!(
            "<h2>{} - Pripomienka</h2><p>{},</p><p>Tvoj aktuálny zostatok v bufete je:</p>\
             <h1 style=\"font-size: 28px; color: #ef4444;\">{}</h1>\
             <p>Nezabudni si prosím vyrovnať dlh u office asistentky.</p>\
             <p>Ďakujeme,<br/>{}</p>",
            SIGNATURE, greeting, balance, SIGNATURE
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(contribution_cents: i64, new_balance_cents: i64) -> DepositNotice {
        DepositNotice {
            email: "jana@firma.sk".to_string(),
            name: Some("Jana".to_string()),
            total_paid_cents: 2_000,
            deposited_cents: 2_000 - contribution_cents,
            contribution_cents,
            previous_balance_cents: -1_250,
            new_balance_cents,
        }
    }

    #[test]
    fn test_login_code_email() {
        let message = login_code_email("jana@firma.sk", "042517", 10);
        assert_eq!(message.to, "jana@firma.sk");
        assert!(message.text.contains("042517"));
        assert!(message.text.contains("10 minút"));
        assert!(message.html.contains("042517"));
    }

    #[test]
    fn test_deposit_without_contribution() {
        let message = deposit_confirmation_email(&notice(0, 750));
        assert!(message.text.starts_with("Ahoj Jana,"));
        assert!(message.text.contains("Zaplatená suma: 20.00 €"));
        assert!(!message.text.contains("Príspevok na manko"));
        assert!(message.text.contains("Predchádzajúci zostatok: -12.50 €"));
        assert!(message.text.contains("Máš kredit 7.50 €"));
    }

    #[test]
    fn test_deposit_with_contribution_and_remaining_debt() {
        let message = deposit_confirmation_email(&notice(500, 250 - 500));
        assert!(message.text.contains("  - Na účet: 15.00 €"));
        assert!(message.text.contains("  - Príspevok na manko: 5.00 €"));
        assert!(!message.text.contains("kredit"));
    }

    #[test]
    fn test_debt_reminder_email() {
        let message = debt_reminder_email("peter@firma.sk", None, -1_840);
        assert!(message.text.starts_with("Ahoj,"));
        assert!(message.text.contains("-18.40 €"));
    }

    #[tokio::test]
    async fn test_console_transport_never_fails() {
        let notifier = Notifier::console("canteen@firma.sk");
        let message = debt_reminder_email("peter@firma.sk", Some("Peter"), -600);
        assert!(notifier.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_resend_without_key_is_skipped() {
        let notifier = Notifier::new(&EmailConfig {
            mode: EmailMode::Resend,
            from_address: "canteen@firma.sk".to_string(),
            resend_api_key: None,
            relay_url: None,
        });
        let message = login_code_email("jana@firma.sk", "123456", 10);
        assert!(notifier.send(&message).await.is_ok());
    }
}
