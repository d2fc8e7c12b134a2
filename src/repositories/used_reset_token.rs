use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::models::UsedResetToken;

/// 使用済みリセットトークン記録の境界インターフェース
///
/// トークンの一回限り使用（single-use）を担保するための無効化記録。
/// キーはトークン文字列の SHA256 ハッシュ（平文トークンは保存しない）。
#[async_trait]
pub trait UsedTokenStore: Send + Sync {
    /// トークンが使用済みかどうか
    async fn is_spent(&self, token_hash: &str) -> Result<bool, AppError>;

    /// トークンを使用済みとして記録する（原子的な先勝ち）
    ///
    /// 新規に記録できた場合はその記録を、既に記録済みの場合は `None` を返す。
    /// 並行する確認リクエストのうち一つだけが `Some` を受け取る。
    ///
    /// `expires_at` はトークン本体の有効期限の上限。期限を過ぎた記録は
    /// 検証で参照されることがないため `delete_expired` で回収してよい。
    async fn mark_spent(
        &self,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<UsedResetToken>, AppError>;

    /// 期限切れの記録を削除し、削除行数を返す
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct UsedResetTokenRepository {
    pool: PgPool,
}

impl UsedResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsedTokenStore for UsedResetTokenRepository {
    async fn is_spent(&self, token_hash: &str) -> Result<bool, AppError> {
        let spent: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM used_reset_tokens
                WHERE token_hash = $1
            )
            "#,
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(spent)
    }

    async fn mark_spent(
        &self,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<Option<UsedResetToken>, AppError> {
        // ON CONFLICT DO NOTHING: 既存行があると RETURNING は行を返さない
        let record = sqlx::query_as::<_, UsedResetToken>(
            r#"
            INSERT INTO used_reset_tokens (token_hash, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (token_hash) DO NOTHING
            RETURNING id, token_hash, expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM used_reset_tokens
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
