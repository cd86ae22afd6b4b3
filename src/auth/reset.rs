use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};

use crate::db::DbPool;

const TOKEN_LEN: usize = 48;

/// Random alphanumeric token. Opaque to the client; the raw value is the
/// lookup key in password_resets.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Issue a one-time reset token for the user and persist it with its expiry.
pub async fn issue(db: &DbPool, user_id: &str, ttl_minutes: i64) -> Result<String> {
    let token = generate_token();
    let expires_at = (Utc::now() + Duration::minutes(ttl_minutes)).to_rfc3339();

    sqlx::query(
        "INSERT INTO password_resets (token, user_id, expires_at) VALUES (?, ?, ?)"
    )
    .bind(&token)
    .bind(user_id)
    .bind(&expires_at)
    .execute(db)
    .await?;

    Ok(token)
}

/// Consume a reset token: returns the owning user id if the token exists,
/// is unexpired and unused, and marks it used. Returns None otherwise.
pub async fn consume(db: &DbPool, token: &str) -> Result<Option<String>> {
    let row: Option<(String, String, Option<String>)> = sqlx::query_as(
        "SELECT user_id, expires_at, used_at FROM password_resets WHERE token = ?"
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    let (user_id, expires_at, used_at) = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    if used_at.is_some() {
        return Ok(None);
    }

    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .map_err(|e| anyhow::anyhow!("Corrupt expires_at in password_resets: {}", e))?;
    if Utc::now() > expires_at {
        return Ok(None);
    }

    sqlx::query("UPDATE password_resets SET used_at = ? WHERE token = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(token)
        .execute(db)
        .await?;

    Ok(Some(user_id))
}
