use axum::{Json, extract::State, http::HeaderMap, http::header::AUTHORIZATION};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::repositories::UserStore;
use crate::services::session::SessionManager;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// 現在のアカウント情報ハンドラー
///
/// GET /api/me
///
/// `Authorization: Bearer <session_token>` からユーザーを解決する。
pub async fn current_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Authentication("missing_session".to_string()))?;

    let user_id = state
        .sessions
        .current_user_id(token)
        .ok_or_else(|| AppError::Authentication("invalid_session".to_string()))?;

    let user = state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("unknown_user".to_string()))?;

    Ok(Json(AccountResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    }))
}

/// Authorization ヘッダーから Bearer トークンを取り出す
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
