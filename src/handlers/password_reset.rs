use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::repositories::{UsedResetTokenRepository, UserRepository};
use crate::services::{PasswordResetService, SmtpMailer};
use crate::state::AppState;

/// AppState からパスワードリセットサービスを組み立てる
fn reset_service(
    state: &AppState,
) -> PasswordResetService<UserRepository, UsedResetTokenRepository, SmtpMailer> {
    PasswordResetService::new(
        state.user_repo.clone(),
        state.used_token_repo.clone(),
        state.mailer.clone(),
        state.reset_signer.clone(),
        state.config.app_base_url.clone(),
    )
}

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
}

/// パスワードリセットリクエストハンドラー
///
/// POST /api/password/reset-request
///
/// 永続状態は一切変更しない。未登録メールは 404 を返す（登録有無が
/// レスポンスから分かる点は既知の仕様）。
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<ResetRequestResponse>, AppError> {
    // バリデーション
    validate_email(&request.email)?;

    reset_service(&state).request_reset(&request.email).await?;

    Ok(Json(ResetRequestResponse {
        message: "パスワードリセット手順をメールで送信しました".to_string(),
    }))
}

// === トークン検証（リセットURLの GET） ===

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
}

/// リセットトークン検証ハンドラー
///
/// GET /reset_password/{token}
///
/// メールに記載されたリンクの到達先。トークンを検証するだけで状態は変更しない。
/// 不正・期限切れトークンはエラーになり、フォーム表示へ進ませない。
pub async fn verify_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerifyTokenResponse>, AppError> {
    reset_service(&state).verify_token(&token).await?;

    Ok(Json(VerifyTokenResponse { valid: true }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// パスワードリセット実行ハンドラー
///
/// POST /reset_password/{token}
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    // バリデーション
    validate_reset_password_request(&token, &request)?;

    reset_service(&state)
        .reset_password(&token, &request.new_password)
        .await?;

    tracing::info!("パスワードリセット完了");

    Ok(Json(ResetPasswordResponse {
        message: "パスワードが更新されました".to_string(),
    }))
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(
    token: &str,
    request: &ResetPasswordRequest,
) -> Result<(), AppError> {
    if token.trim().is_empty() {
        return Err(AppError::Validation("トークンは必須です".to_string()));
    }
    if request.new_password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}
