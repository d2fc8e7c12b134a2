pub mod auth;
pub mod email;
pub mod password_reset;
pub mod session;
pub mod token;

pub use auth::AuthService;
pub use email::{Mailer, SmtpMailer};
pub use password_reset::PasswordResetService;
pub use session::{SessionManager, SignedSessionManager};
pub use token::TokenSigner;
