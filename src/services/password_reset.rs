use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::repositories::{UsedTokenStore, UserStore};
use crate::services::auth::hash_password;
use crate::services::email::Mailer;
use crate::services::token::TokenSigner;

const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

/// パスワードリセットサービス
///
/// トークンは署名付きの自己完結型（DB保存なし）。使用済みトークンだけ
/// ハッシュで記録し、一度使ったトークンの再利用を拒否する。
#[derive(Clone)]
pub struct PasswordResetService<U, T, M> {
    user_store: U,
    used_tokens: T,
    mailer: M,
    signer: TokenSigner,
    app_base_url: Option<String>,
}

impl<U, T, M> PasswordResetService<U, T, M>
where
    U: UserStore,
    T: UsedTokenStore,
    M: Mailer,
{
    /// 新しい PasswordResetService を作成
    pub fn new(
        user_store: U,
        used_tokens: T,
        mailer: M,
        signer: TokenSigner,
        app_base_url: Option<String>,
    ) -> Self {
        Self {
            user_store,
            used_tokens,
            mailer,
            signer,
            app_base_url,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// 永続状態は一切変更しない。メール送信に失敗しても巻き戻す状態が存在しない。
    ///
    /// # Security
    /// - トークン（平文）はログに出力しない
    /// - ユーザー不在は `UserNotFound` を返す。ユーザー向けの文言は呼び出し側が決める
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self
            .user_store
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let token = self.signer.issue(user.id)?;
        let reset_url = self.build_reset_url(&token);

        let body = format!(
            "パスワードをリセットするには、以下のリンクにアクセスしてください:\n\
             {}\n\n\
             このリクエストに心当たりがない場合は、このメールを無視してください。\n\
             パスワードが変更されることはありません。\n",
            reset_url
        );

        self.mailer
            .send(&user.email, "パスワードリセットのご案内", &body)
            .await?;

        tracing::info!(email = %email, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// トークンを検証し、対象のユーザーIDを返す（状態変更なし）
    ///
    /// リセットURLの GET で、フォーム表示前の事前チェックに使う。
    pub async fn verify_token(&self, token: &str) -> Result<i64, AppError> {
        let user_id = self.signer.verify(token)?;

        if self.used_tokens.is_spent(&hash_token(token)).await? {
            tracing::warn!(user_id = %user_id, "使用済みトークン");
            return Err(AppError::TokenExpired);
        }

        Ok(user_id)
    }

    /// パスワードをリセット
    ///
    /// 検証に失敗した場合は一切書き込みを行わない。署名・期限の検証後、
    /// まずトークンを使用済みとして確保し（先勝ち）、それからパスワードを
    /// 上書きする。確保後に後続が失敗してもトークンが無効化されるだけで、
    /// 資格情報は変わらない（安全側に倒れる）。
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    /// - 同じトークンによる並行リクエストは確保に成功した一つだけが書き込みに進む
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let user_id = self.signer.verify(token)?;

        // 使用済み記録の確保。記録の寿命はトークン本体の残存期間の上限に合わせる
        let expires_at = OffsetDateTime::now_utc() + self.signer.ttl();
        if self
            .used_tokens
            .mark_spent(&hash_token(token), expires_at)
            .await?
            .is_none()
        {
            tracing::warn!(user_id = %user_id, "使用済みトークン");
            return Err(AppError::TokenExpired);
        }

        let password_hash = hash_password(new_password)?;

        self.user_store
            .update_password(user_id, &password_hash)
            .await?;

        tracing::info!(user_id = %user_id, "パスワードリセット完了");

        Ok(())
    }

    /// リセットURLを構築（トークンはパスセグメント）
    fn build_reset_url(&self, token: &str) -> String {
        let base = self
            .app_base_url
            .as_deref()
            .unwrap_or(DEFAULT_APP_BASE_URL);
        format!("{}/reset_password/{}", base, token)
    }
}

/// トークンをSHA256でハッシュ化（使用済み記録のキー）
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
