use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::AppState;
use crate::db::audit;
use crate::db::models::note::{CreateNoteRequest, UpdateNoteRequest};
use crate::error::{AppError, AppResult};

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Value>> {
    let rows: Vec<(String, String, Option<String>, String, String)> = sqlx::query_as(
        "SELECT id, title, content, created_at, updated_at
         FROM notes WHERE user_id = ? ORDER BY created_at DESC"
    )
    .bind(&auth.0.sub)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<Value> = rows
        .into_iter()
        .map(|(id, title, content, created_at, updated_at)| {
            json!({
                "id": id,
                "title": title,
                "content": content,
                "user_id": auth.0.sub,
                "created_at": created_at,
                "updated_at": updated_at,
            })
        })
        .collect();
    let count = data.len();
    Ok(Json(json!({ "data": data, "total": count })))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let row: Option<(String, String, Option<String>, String, String, String)> = sqlx::query_as(
        "SELECT id, title, content, user_id, created_at, updated_at
         FROM notes WHERE id = ?"
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?;

    let (id, title, content, user_id, created_at, updated_at) = row
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

    if user_id != auth.0.sub {
        return Err(AppError::Forbidden("Note is owned by another user".to_string()));
    }

    Ok(Json(json!({
        "id": id,
        "title": title,
        "content": content,
        "user_id": user_id,
        "created_at": created_at,
        "updated_at": updated_at,
    })))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateNoteRequest>,
) -> AppResult<Json<Value>> {
    let title = body.title.trim().to_string();

    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO notes (id, title, content, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(&title)
    .bind(body.content.as_deref())
    .bind(&auth.0.sub)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    state.metrics.inc_note_created();
    audit::log_action(
        state.db.clone(),
        auth.0.sub.clone(),
        auth.0.email.clone(),
        "note_created",
        "note",
        Some(id.clone()),
        Some(title.clone()),
        None,
    );

    Ok(Json(json!({
        "id": id,
        "title": title,
        "content": body.content,
        "user_id": auth.0.sub,
        "created_at": now,
        "updated_at": now,
    })))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateNoteRequest>,
) -> AppResult<Json<Value>> {
    let title = body.title.trim().to_string();

    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let existing: Option<(String, String)> = sqlx::query_as(
        "SELECT user_id, created_at FROM notes WHERE id = ?"
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?;

    let (owner, created_at) = existing
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

    if owner != auth.0.sub {
        return Err(AppError::Forbidden("Note is owned by another user".to_string()));
    }

    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&title)
        .bind(body.content.as_deref())
        .bind(&now)
        .bind(&id)
        .execute(&state.db)
        .await?;

    state.metrics.inc_note_updated();
    audit::log_action(
        state.db.clone(),
        auth.0.sub.clone(),
        auth.0.email.clone(),
        "note_updated",
        "note",
        Some(id.clone()),
        Some(title.clone()),
        None,
    );

    Ok(Json(json!({
        "id": id,
        "title": title,
        "content": body.content,
        "user_id": auth.0.sub,
        "created_at": created_at,
        "updated_at": now,
    })))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT user_id FROM notes WHERE id = ?"
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?;

    let (owner,) = existing
        .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

    if owner != auth.0.sub {
        return Err(AppError::Forbidden("Note is owned by another user".to_string()));
    }

    sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    state.metrics.inc_note_deleted();
    audit::log_action(
        state.db.clone(),
        auth.0.sub.clone(),
        auth.0.email.clone(),
        "note_deleted",
        "note",
        Some(id),
        None,
        None,
    );

    Ok(Json(json!({"success": true})))
}
