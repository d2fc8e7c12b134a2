use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserStore;

/// パスワードをargon2idでハッシュ化
///
/// ソルトは呼び出しごとにランダム生成するため、同じ平文でも出力は毎回異なる。
/// ワークファクターは argon2 のデフォルトパラメータ（argon2id v19）。
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
///
/// 保存ハッシュが壊れている場合は不一致として扱う（エラーにしない）。
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー（不一致として扱う）");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// 認証サービス
#[derive(Clone)]
pub struct AuthService<U: UserStore> {
    user_store: U,
}

impl<U: UserStore> AuthService<U> {
    /// 新しい AuthService を作成
    pub fn new(user_store: U) -> Self {
        Self { user_store }
    }

    /// ユーザー認証を実行
    ///
    /// # Security
    /// - 「ユーザー不在」と「パスワード不一致」は同一のエラー値を返す（存在有無の漏洩防止）
    /// - タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.user_store.find_by_email(email).await?;

        match user {
            Some(user) => {
                if verify_password(password, &user.password_hash) {
                    tracing::info!(email = %email, "認証成功");
                    Ok(user)
                } else {
                    tracing::warn!(email = %email, "認証失敗: パスワード不一致");
                    Err(invalid_credentials())
                }
            }
            None => {
                // タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
                // これにより、ユーザーの存在有無を応答時間から推測できなくなる
                let dummy_hash = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RWh6";
                let _ = verify_password(password, dummy_hash);
                tracing::warn!(email = %email, "認証失敗: ユーザー不在");
                Err(invalid_credentials())
            }
        }
    }
}

/// 認証失敗エラー
///
/// 不在・不一致のどちらでも必ずこの関数経由で同じ値を作る
fn invalid_credentials() -> AppError {
    AppError::Authentication("invalid_credentials".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_hashing_is_salted() {
        // 同じ平文でもソルトが異なるため出力は毎回異なり、どちらも検証に成功する
        let h1 = hash_password("password123").unwrap();
        let h2 = hash_password("password123").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("password123", &h1));
        assert!(verify_password("password123", &h2));
    }

    #[test]
    fn test_malformed_stored_hash_does_not_match() {
        assert!(!verify_password("password123", "invalid_hash_format"));
        assert!(!verify_password("password123", ""));
    }

    /// テスト用インメモリユーザーストア
    #[derive(Clone, Default)]
    struct SpyUserStore {
        users: Arc<Mutex<HashMap<i64, User>>>,
    }

    impl SpyUserStore {
        fn with_user(user: User) -> Self {
            let store = Self::default();
            store.users.lock().unwrap().insert(user.id, user);
            store
        }
    }

    #[async_trait]
    impl UserStore for SpyUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&user_id).cloned())
        }

        async fn create_user(
            &self,
            _username: &str,
            _email: &str,
            _password_hash: &str,
        ) -> Result<User, AppError> {
            unreachable!("このテストでは呼ばれない")
        }

        async fn update_password(
            &self,
            _user_id: i64,
            _new_password_hash: &str,
        ) -> Result<(), AppError> {
            unreachable!("このテストでは呼ばれない")
        }
    }

    fn test_user(id: i64, email: &str, password: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id,
            username: format!("user{}", id),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let store = SpyUserStore::with_user(test_user(1, "test@example.com", "password123"));
        let service = AuthService::new(store);

        let user = service
            .authenticate("test@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_return_identical_error() {
        let store = SpyUserStore::with_user(test_user(1, "test@example.com", "password123"));
        let service = AuthService::new(store);

        let unknown = service
            .authenticate("nobody@example.com", "password123")
            .await
            .unwrap_err();
        let wrong = service
            .authenticate("test@example.com", "wrong-password")
            .await
            .unwrap_err();

        // 存在有無を区別できない: どちらも完全に同じエラー値
        match (&unknown, &wrong) {
            (AppError::Authentication(a), AppError::Authentication(b)) => assert_eq!(a, b),
            _ => panic!("どちらも Authentication エラーであるべき: {:?} / {:?}", unknown, wrong),
        }
    }
}
