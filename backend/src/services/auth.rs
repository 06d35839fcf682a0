//! Authentication service: emailed one-time codes, token issuance and revocation

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared::models::{role_for_email, should_upgrade_role, User, UserRole};
use shared::validation::{is_email_domain_allowed, normalize_email, validate_email, validate_otp_code};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::notification::{login_code_email, Notifier};

type HmacSha256 = Hmac<Sha256>;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    notifier: Notifier,
    jwt_secret: String,
    token_expiry_days: i64,
    code_expiry_minutes: i64,
    allowed_email_domains: Vec<String>,
    office_assistant_emails: Vec<String>,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub token_version: i32,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize)]
pub struct RequestCodeInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeInput {
    pub email: String,
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
}

/// Token plus the user it was issued for
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// User info from database
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| AppError::Internal(format!("Corrupt user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            token_version: row.token_version,
            created_at: row.created_at,
        })
    }
}

pub(crate) async fn find_user(conn: &mut PgConnection, id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, role, token_version, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("User".to_string()))?
    .try_into()
}

/// Keyed digest of a login code; only the digest is ever stored
fn hash_code(secret: &str, email: &str, code: &str) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Configuration(format!("Invalid code hashing key: {}", e)))?;
    mac.update(email.as_bytes());
    mac.update(b":");
    mac.update(code.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}

fn clean_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, notifier: Notifier, config: &Config) -> Self {
        Self {
            db,
            notifier,
            jwt_secret: config.jwt.secret.clone(),
            token_expiry_days: config.jwt.token_expiry_days,
            code_expiry_minutes: config.auth.code_expiry_minutes,
            allowed_email_domains: config.auth.allowed_email_domains.clone(),
            office_assistant_emails: config.auth.office_assistant_emails.clone(),
        }
    }

    /// Email a fresh six digit login code, replacing any unused one
    pub async fn request_code(&self, input: RequestCodeInput) -> AppResult<()> {
        let email = normalize_email(&input.email);
        validate_email(&email).map_err(|msg| {
            AppError::validation("email", msg, "Neplatný formát emailu")
        })?;

        if !is_email_domain_allowed(&email, &self.allowed_email_domains) {
            return Err(AppError::EmailDomainNotAllowed {
                allowed: self.allowed_email_domains.clone(),
            });
        }

        let code = generate_code();
        let code_hash = hash_code(&self.jwt_secret, &email, &code)?;
        let expires_at = Utc::now() + Duration::minutes(self.code_expiry_minutes);

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE login_codes SET used = TRUE WHERE email = $1 AND NOT used")
            .bind(&email)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO login_codes (email, code_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(&email)
            .bind(&code_hash)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.notifier
            .send(&login_code_email(&email, &code, self.code_expiry_minutes))
            .await
            .map_err(|e| {
                tracing::error!(email = %email, "Failed to deliver login code: {}", e);
                e
            })?;

        tracing::info!(email = %email, "Login code issued");
        Ok(())
    }

    /// Exchange a valid code for a token, creating the user on first login
    pub async fn verify_code(&self, input: VerifyCodeInput) -> AppResult<AuthResponse> {
        let email = normalize_email(&input.email);
        validate_otp_code(input.code.trim()).map_err(|_| AppError::InvalidCode)?;
        let code_hash = hash_code(&self.jwt_secret, &email, input.code.trim())?;
        let name = clean_name(input.name.as_deref());

        let mut tx = self.db.begin().await?;

        let code_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM login_codes
            WHERE email = $1 AND code_hash = $2 AND NOT used AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(&email)
        .bind(&code_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::InvalidCode)?;

        sqlx::query("UPDATE login_codes SET used = TRUE WHERE id = $1")
            .bind(code_id)
            .execute(&mut *tx)
            .await?;

        let entitled = role_for_email(&email, &self.office_assistant_emails);

        let existing = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, role, token_version, created_at
            FROM users WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;

        let user: User = match existing {
            None => {
                let row = sqlx::query_as::<_, UserRow>(
                    r#"
                    INSERT INTO users (email, name, role)
                    VALUES ($1, $2, $3)
                    RETURNING id, email, name, role, token_version, created_at
                    "#,
                )
                .bind(&email)
                .bind(&name)
                .bind(entitled.as_str())
                .fetch_one(&mut *tx)
                .await?;
                tracing::info!(email = %email, role = %entitled, "Created new user");
                row.try_into()?
            }
            Some(row) => {
                let mut user: User = row.try_into()?;
                if should_upgrade_role(user.role, entitled) {
                    sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
                        .bind(user.id)
                        .bind(entitled.as_str())
                        .execute(&mut *tx)
                        .await?;
                    user.role = entitled;
                    tracing::info!(email = %email, role = %entitled, "Upgraded user role");
                }
                if name.is_some() && name != user.name {
                    sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
                        .bind(user.id)
                        .bind(&name)
                        .execute(&mut *tx)
                        .await?;
                    user.name = name;
                }
                user
            }
        };

        tx.commit().await?;

        let token = self.issue_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Set or clear the display name; the token is re-issued with the new name
    pub async fn update_profile(&self, user_id: Uuid, input: UpdateProfileInput) -> AppResult<AuthResponse> {
        let name = clean_name(input.name.as_deref());

        let mut conn = self.db.acquire().await?;
        sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
            .bind(user_id)
            .bind(&name)
            .execute(&mut *conn)
            .await?;
        let user = find_user(&mut conn, user_id).await?;

        let token = self.issue_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Revoke every token issued to the user so far
    pub async fn logout_everywhere(&self, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %user_id, "All sessions revoked");
        Ok(())
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        encode_token(&self.jwt_secret, self.token_expiry_days, user)
    }
}

/// Sign a token for `user`
pub fn encode_token(secret: &str, expiry_days: i64, user: &User) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        token_version: user.token_version,
        iat: now.timestamp(),
        exp: (now + Duration::days(expiry_days)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

/// Verify signature and expiry of a token
pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length";

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "jana@firma.sk".to_string(),
            name: Some("Jana".to_string()),
            role: UserRole::OfficeAssistant,
            token_version: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = user();
        let token = encode_token(SECRET, 365, &user).unwrap();
        let claims = decode_token(SECRET, &token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::OfficeAssistant);
        assert_eq!(claims.token_version, 3);
        assert!(claims.exp - claims.iat >= 365 * 24 * 3600);
    }

    #[test]
    fn test_token_with_wrong_secret_rejected() {
        let token = encode_token(SECRET, 365, &user()).unwrap();
        assert!(matches!(
            decode_token("another-secret-entirely", &token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = encode_token(SECRET, -2, &user()).unwrap();
        assert!(matches!(decode_token(SECRET, &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_code_hash_is_keyed_and_bound_to_email() {
        let a = hash_code(SECRET, "jana@firma.sk", "123456").unwrap();
        assert_eq!(a, hash_code(SECRET, "jana@firma.sk", "123456").unwrap());
        assert_ne!(a, hash_code(SECRET, "peter@firma.sk", "123456").unwrap());
        assert_ne!(a, hash_code("other-secret-value", "jana@firma.sk", "123456").unwrap());
        assert!(!a.contains("123456"));
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert!(validate_otp_code(&code).is_ok(), "bad code {}", code);
        }
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(Some("  Jana ")), Some("Jana".to_string()));
        assert_eq!(clean_name(Some("   ")), None);
        assert_eq!(clean_name(None), None);
    }
}
