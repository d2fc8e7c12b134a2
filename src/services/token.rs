use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// ペイロード長: user_id (i64 BE 8バイト) + issued_at (unix秒 i64 BE 8バイト)
const PAYLOAD_LEN: usize = 16;

/// パスワードリセットトークン用のコンテキストラベル
const RESET_CONTEXT: &[u8] = b"inkgate.password-reset.v1";

/// セッショントークン用のコンテキストラベル
const SESSION_CONTEXT: &[u8] = b"inkgate.session.v1";

/// 自己完結型の署名付きトークンの発行・検証
///
/// `{user_id, issued_at}` を HMAC-SHA256 で署名し、URL セーフな
/// `base64url(payload).base64url(mac)` 形式にエンコードする。
/// サーバー側に保存せずに検証できる。
///
/// コンテキストラベルを MAC 入力に含めることで、同じシークレットキーで
/// 署名したリセットトークンとセッショントークンの相互流用を防ぐ。
///
/// # Security
/// - 検証は署名 → 期限の順。改ざんされたトークンは期限切れでも `TokenInvalid`
/// - シークレットキーをローテーションすると発行済みトークンは全て無効になる
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
    ttl_secs: i64,
    context: &'static [u8],
}

impl TokenSigner {
    /// パスワードリセットトークン用の署名器を作成
    pub fn password_reset(secret: &str, ttl_secs: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl_secs,
            context: RESET_CONTEXT,
        }
    }

    /// セッショントークン用の署名器を作成
    pub fn session(secret: &str, ttl_secs: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl_secs,
            context: SESSION_CONTEXT,
        }
    }

    /// トークンの有効期間
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs)
    }

    /// ユーザーIDに紐づくトークンを発行
    ///
    /// 同じユーザーでも発行時刻が異なれば別の文字列になる（issued_at が変わるため）。
    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    /// トークンを検証し、対象のユーザーIDを返す
    ///
    /// # Errors
    /// - `TokenInvalid`: 形式不正・署名不一致（改ざん・キー不一致を含む）
    /// - `TokenExpired`: 署名は正しいが `issued_at + ttl` を過ぎている
    pub fn verify(&self, token: &str) -> Result<i64, AppError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// 発行時刻を指定してトークンを発行（テストで時刻を操作するために分離）
    pub(crate) fn issue_at(&self, user_id: i64, now: OffsetDateTime) -> Result<String, AppError> {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..8].copy_from_slice(&user_id.to_be_bytes());
        payload[8..].copy_from_slice(&now.unix_timestamp().to_be_bytes());

        let tag = self.sign(&payload)?;

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// 現在時刻を指定してトークンを検証（テストで時刻を操作するために分離）
    pub(crate) fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<i64, AppError> {
        let (payload_b64, tag_b64) = token.split_once('.').ok_or(AppError::TokenInvalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AppError::TokenInvalid)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| AppError::TokenInvalid)?;

        if payload.len() != PAYLOAD_LEN {
            return Err(AppError::TokenInvalid);
        }

        // 署名検証（定数時間比較）。期限チェックより必ず先に行う
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init error: {}", e)))?;
        mac.update(self.context);
        mac.update(&payload);
        mac.verify_slice(&tag).map_err(|_| AppError::TokenInvalid)?;

        let mut id_bytes = [0u8; 8];
        id_bytes.copy_from_slice(&payload[..8]);
        let user_id = i64::from_be_bytes(id_bytes);

        let mut ts_bytes = [0u8; 8];
        ts_bytes.copy_from_slice(&payload[8..]);
        let issued_at = i64::from_be_bytes(ts_bytes);

        if now.unix_timestamp() > issued_at + self.ttl_secs {
            return Err(AppError::TokenExpired);
        }

        Ok(user_id)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init error: {}", e)))?;
        mac.update(self.context);
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-0123456789abcdef";
    const TTL: i64 = 1800;

    fn signer() -> TokenSigner {
        TokenSigner::password_reset(SECRET, TTL)
    }

    #[test]
    fn test_issue_then_verify_returns_user_id() {
        let signer = signer();
        let token = signer.issue(42).unwrap();
        let user_id = signer.verify(&token).unwrap();
        assert_eq!(user_id, 42);
    }

    #[test]
    fn test_token_is_url_path_safe() {
        let signer = signer();
        let token = signer.issue(i64::MAX).unwrap();
        // パスセグメントとして使える文字のみ（base64url + 区切りの '.'）
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
    }

    #[test]
    fn test_different_instants_produce_different_tokens() {
        let signer = signer();
        let now = OffsetDateTime::now_utc();
        let t1 = signer.issue_at(7, now).unwrap();
        let t2 = signer.issue_at(7, now + Duration::seconds(1)).unwrap();
        assert_ne!(t1, t2);
        assert_eq!(signer.verify(&t1).unwrap(), 7);
        assert_eq!(signer.verify(&t2).unwrap(), 7);
    }

    #[test]
    fn test_expired_token_is_expired_not_invalid() {
        let signer = signer();
        let now = OffsetDateTime::now_utc();
        let token = signer.issue_at(3, now - Duration::seconds(TTL + 1)).unwrap();
        let result = signer.verify_at(&token, now);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_token_valid_at_exact_ttl_boundary() {
        let signer = signer();
        let now = OffsetDateTime::now_utc();
        let token = signer.issue_at(3, now - Duration::seconds(TTL)).unwrap();
        // now == issued_at + ttl はまだ有効
        assert_eq!(signer.verify_at(&token, now).unwrap(), 3);
    }

    #[test]
    fn test_any_single_bit_flip_in_payload_is_invalid() {
        let signer = signer();
        let token = signer.issue(42).unwrap();
        let (payload_b64, tag_b64) = token.split_once('.').unwrap();
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut tampered = payload.clone();
                tampered[byte] ^= 1 << bit;
                let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(&tampered), tag_b64);
                let result = signer.verify(&forged);
                assert!(
                    matches!(result, Err(AppError::TokenInvalid)),
                    "byte {} bit {} が Invalid にならなかった",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_wrong_secret_key_is_invalid() {
        let signer = signer();
        let other = TokenSigner::password_reset("another-secret-key", TTL);
        let token = signer.issue(42).unwrap();
        let result = other.verify(&token);
        assert!(matches!(result, Err(AppError::TokenInvalid)));
    }

    #[test]
    fn test_tampered_and_expired_token_is_invalid() {
        // 署名検証が期限チェックより先: 改ざんされた期限切れトークンは Invalid
        let signer = signer();
        let now = OffsetDateTime::now_utc();
        let token = signer.issue_at(3, now - Duration::seconds(TTL + 100)).unwrap();
        let (payload_b64, tag_b64) = token.split_once('.').unwrap();
        let mut payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        payload[0] ^= 0x01;
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(&payload), tag_b64);
        let result = signer.verify_at(&forged, now);
        assert!(matches!(result, Err(AppError::TokenInvalid)));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let signer = signer();
        for token in ["", "no-dot", "a.b", "!!!.???", "too.many.dots"] {
            let result = signer.verify(token);
            assert!(
                matches!(result, Err(AppError::TokenInvalid)),
                "{:?} が Invalid にならなかった",
                token
            );
        }
    }

    #[test]
    fn test_context_labels_are_not_interchangeable() {
        // 同じキーでもリセットトークンをセッショントークンとして使えない
        let reset = TokenSigner::password_reset(SECRET, TTL);
        let session = TokenSigner::session(SECRET, TTL);
        let token = reset.issue(42).unwrap();
        assert!(matches!(session.verify(&token), Err(AppError::TokenInvalid)));
    }
}
