//! Configuration management for the canteen server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CANTEEN__ prefix

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use shared::validation::parse_list;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Login code and role assignment settings
    pub auth: AuthConfig,

    pub email: EmailConfig,

    /// Monthly debt reminder sweep
    pub reminder: ReminderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,

    pub host: String,

    /// Allowed CORS origin; `*` allows any
    pub cors_origin: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens and hashing login codes
    pub secret: String,

    /// Token lifetime in days
    pub token_expiry_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Domains allowed to sign in; empty allows every domain
    #[serde(deserialize_with = "deserialize_list")]
    pub allowed_email_domains: Vec<String>,

    /// Addresses (or address suffixes) granted the office assistant role
    #[serde(deserialize_with = "deserialize_list")]
    pub office_assistant_emails: Vec<String>,

    /// Minutes a login code stays valid
    pub code_expiry_minutes: i64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailMode {
    /// Log messages instead of sending them
    Console,
    /// Resend HTTP API
    Resend,
    /// MailChannels-compatible JSON relay
    Relay,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub mode: EmailMode,

    pub from_address: String,

    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default)]
    pub relay_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReminderConfig {
    /// Run the sweep automatically in the background
    pub enabled: bool,

    /// Users with a balance below this receive a reminder
    pub debt_threshold_cents: i64,

    pub day_of_month: u32,

    pub hour_utc: u32,
}

/// Lists may be given as a comma separated string (env vars) or a TOML array
#[derive(Deserialize)]
#[serde(untagged)]
enum ListSetting {
    Csv(String),
    Items(Vec<String>),
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ListSetting::deserialize(deserializer)? {
        ListSetting::Csv(raw) => parse_list(&raw),
        ListSetting::Items(items) => parse_list(&items.join(",")),
    })
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("CANTEEN_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.cors_origin", "*")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.token_expiry_days", 365)?
            .set_default("auth.allowed_email_domains", "")?
            .set_default("auth.office_assistant_emails", "")?
            .set_default("auth.code_expiry_minutes", 10)?
            .set_default("email.mode", "console")?
            .set_default("email.from_address", "canteen@localhost")?
            .set_default("reminder.enabled", false)?
            .set_default("reminder.debt_threshold_cents", -500)?
            .set_default("reminder.day_of_month", 1)?
            .set_default("reminder.hour_utc", 8)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CANTEEN__ prefix)
            .add_source(
                Environment::with_prefix("CANTEEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 16 {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 16 characters".into(),
            ));
        }
        if !(1..=28).contains(&self.reminder.day_of_month) {
            return Err(ConfigError::Message(
                "reminder.day_of_month must be between 1 and 28".into(),
            ));
        }
        if self.reminder.hour_utc > 23 {
            return Err(ConfigError::Message(
                "reminder.hour_utc must be between 0 and 23".into(),
            ));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
