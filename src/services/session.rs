use crate::error::AppError;
use crate::services::token::TokenSigner;

/// セッション管理の境界インターフェース
///
/// ワークフローが必要とする操作だけに絞る: ログイン・現在ユーザーの解決・ログアウト。
pub trait SessionManager: Send + Sync {
    /// 認証済みセッションを確立し、セッショントークンを返す
    fn login(&self, user_id: i64) -> Result<String, AppError>;

    /// トークンから現在のユーザーIDを解決する
    ///
    /// 無効・期限切れのトークンは `None`（エラーにしない）。
    fn current_user_id(&self, token: &str) -> Option<i64>;

    /// セッションを破棄する
    fn logout(&self, token: &str);
}

/// 署名付きトークンによるセッション管理
///
/// セッションはサーバー側に保存しない。ログアウトはクライアント側での
/// トークン破棄に相当する（ステートレスなため失効記録は持たない）。
#[derive(Clone)]
pub struct SignedSessionManager {
    signer: TokenSigner,
}

impl SignedSessionManager {
    /// 新しい SignedSessionManager を作成
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            signer: TokenSigner::session(secret, ttl_secs),
        }
    }
}

impl SessionManager for SignedSessionManager {
    fn login(&self, user_id: i64) -> Result<String, AppError> {
        let token = self.signer.issue(user_id)?;
        tracing::info!(user_id = %user_id, "セッション確立");
        Ok(token)
    }

    fn current_user_id(&self, token: &str) -> Option<i64> {
        match self.signer.verify(token) {
            Ok(user_id) => Some(user_id),
            Err(AppError::TokenInvalid) | Err(AppError::TokenExpired) => None,
            Err(e) => {
                tracing::error!(error = ?e, "セッショントークン検証で予期しないエラー");
                None
            }
        }
    }

    fn logout(&self, _token: &str) {
        // ステートレスセッション: クライアント側のトークン破棄のみ
        tracing::info!("ログアウト");
    }
}
