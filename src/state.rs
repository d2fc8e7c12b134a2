use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{UsedResetTokenRepository, UserRepository};
use crate::services::{SignedSessionManager, SmtpMailer, TokenSigner};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
/// 各コラボレーターはプロセス起動時にここで一度だけ構築し、
/// ハンドラーへ明示的に渡す（プロセス全域のシングルトンには依存しない）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// 使用済みリセットトークンリポジトリ
    pub used_token_repo: UsedResetTokenRepository,
    /// メールサービス
    pub mailer: SmtpMailer,
    /// リセットトークン署名器（シークレットキーは起動後読み取り専用）
    pub reset_signer: TokenSigner,
    /// セッション管理
    pub sessions: SignedSessionManager,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db_pool.clone());
        let used_token_repo = UsedResetTokenRepository::new(db_pool.clone());
        let mailer = SmtpMailer::from_config(&config)?;

        let secret = config.secret_key.expose_secret();
        let reset_signer = TokenSigner::password_reset(secret, config.reset_token_ttl_secs);
        let sessions = SignedSessionManager::new(secret, config.session_ttl_secs);

        Ok(Self {
            db_pool,
            config,
            user_repo,
            used_token_repo,
            mailer,
            reset_signer,
            sessions,
        })
    }
}
