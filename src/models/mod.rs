pub mod used_reset_token;
pub mod user;

pub use used_reset_token::UsedResetToken;
pub use user::User;
