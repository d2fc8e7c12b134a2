pub mod used_reset_token;
pub mod user;

pub use used_reset_token::{UsedResetTokenRepository, UsedTokenStore};
pub use user::{UserRepository, UserStore};
