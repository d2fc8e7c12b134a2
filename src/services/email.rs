use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::Config;
use crate::error::AppError;

/// メール送信の境界インターフェース
///
/// ワークフローが必要とするのは宛先・件名・本文の1回送信のみ。
/// リトライポリシーは持たない（呼び出し側が必要ならタイムアウトを課す）。
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// SMTP メール送信サービス
///
/// SMTP 設定が揃っていない場合は送信せずログ出力のみ（開発モード）。
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: Option<String>,
}

impl SmtpMailer {
    /// 設定から SmtpMailer を作成
    ///
    /// STARTTLS（デフォルトポート587）でリレーする。
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let (Some(host), Some(username), Some(password), Some(from_address)) = (
            &config.smtp_host,
            &config.smtp_username,
            &config.smtp_password,
            &config.smtp_from_address,
        ) else {
            tracing::info!("SMTP 未設定: メールはログ出力のみ（開発モード）");
            return Ok(Self {
                transport: None,
                from_address: None,
            });
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::MailDelivery(format!("SMTPリレーの構築に失敗: {}", e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            ))
            .build();

        tracing::info!(host = %host, port = %config.smtp_port, "SMTP トランスポート初期化完了");

        Ok(Self {
            transport: Some(transport),
            from_address: Some(from_address.clone()),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    /// メールを送信（1リクエストにつき最大1回、リトライなし）
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let (Some(transport), Some(from_address)) = (&self.transport, &self.from_address) else {
            // 開発モード: メール送信せずログ出力のみ。
            // 本文のリセットURLには平文トークンが含まれるため伏せて出力する
            tracing::info!(to = %to, subject = %subject, "メール送信（開発モード）");
            tracing::info!("本文:\n{}", redact_reset_token(body));
            return Ok(());
        };

        let message = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| AppError::MailDelivery(format!("差出人アドレスが不正: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::MailDelivery(format!("宛先アドレスが不正: {}", e)))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| AppError::MailDelivery(format!("メッセージの構築に失敗: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::MailDelivery(format!("SMTP送信に失敗: {}", e)))?;

        tracing::info!(to = %to, "メール送信完了");

        Ok(())
    }
}

/// 本文中のリセットURLのトークン部分を伏せる
///
/// トークンはパスセグメントに平文で入るため、そのままログに出さない。
fn redact_reset_token(body: &str) -> String {
    const MARKER: &str = "/reset_password/";
    let Some(start) = body.find(MARKER) else {
        return body.to_string();
    };
    let token_start = start + MARKER.len();
    let token_end = body[token_start..]
        .find(char::is_whitespace)
        .map(|i| token_start + i)
        .unwrap_or(body.len());
    format!("{}****{}", &body[..token_start], &body[token_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_reset_token_hides_token() {
        let body = "リンク:\nhttps://blog.example.com/reset_password/abc.def\n無視してください\n";
        let redacted = redact_reset_token(body);
        assert!(!redacted.contains("abc.def"));
        assert!(redacted.contains("https://blog.example.com/reset_password/****"));
        assert!(redacted.contains("無視してください"));
    }

    #[test]
    fn test_redact_reset_token_at_end_of_body() {
        let redacted = redact_reset_token("https://blog.example.com/reset_password/abc.def");
        assert_eq!(redacted, "https://blog.example.com/reset_password/****");
    }

    #[test]
    fn test_redact_without_reset_url_is_unchanged() {
        let body = "トークンを含まない本文";
        assert_eq!(redact_reset_token(body), body);
    }
}
