use chrono::Utc;
use crate::db::DbPool;

/// Fire-and-forget: write an audit log entry to the database.
/// Spawns a background task so the caller is never blocked.
pub fn log_action(
    db: DbPool,
    user_id: String,
    email: String,
    action: impl Into<String> + Send + 'static,
    resource: impl Into<String> + Send + 'static,
    resource_id: Option<String>,
    detail: Option<String>,
    ip: Option<String>,
) {
    let action = action.into();
    let resource = resource.into();
    let now = Utc::now().to_rfc3339();

    tokio::spawn(async move {
        let _ = sqlx::query(
            "INSERT INTO audit_log (time, user_id, email, action, resource, resource_id, detail, ip)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&now)
        .bind(&user_id)
        .bind(&email)
        .bind(&action)
        .bind(&resource)
        .bind(resource_id.as_deref())
        .bind(detail.as_deref())
        .bind(ip.as_deref())
        .execute(&db)
        .await;
    });
}
