use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::session::SessionManager;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// ログアウトハンドラー
///
/// POST /api/logout
///
/// セッションはステートレスなため、実体はクライアント側のトークン破棄。
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AppError> {
    if request.session_token.trim().is_empty() {
        return Err(AppError::Validation(
            "セッショントークンは必須です".to_string(),
        ));
    }

    state.sessions.logout(&request.session_token);

    Ok(Json(LogoutResponse {
        message: "ログアウトしました".to_string(),
    }))
}
