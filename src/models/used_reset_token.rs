use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// 使用済みパスワードリセットトークンの記録
///
/// リセットトークン自体は自己完結の署名付き文字列でありDBには保存しない。
/// 使用済みのトークンだけ SHA256 ハッシュで記録し、再利用を拒否する。
/// 行はトークン本体の有効期限と同じタイミングで不要になる（delete_expired で回収）。
#[derive(Debug, FromRow, Serialize)]
pub struct UsedResetToken {
    pub id: Uuid,
    #[serde(skip)]
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}
