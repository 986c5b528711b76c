pub mod auth;
pub mod partner;

pub use auth::{Claims, JwtAuth};
pub use partner::PartnerApiKey;
