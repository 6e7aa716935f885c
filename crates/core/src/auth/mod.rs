pub mod errors;
pub mod password;
pub mod token;

pub use errors::AuthError;
pub use password::{hash_password, verify_password};
pub use token::{SessionClaims, SessionTokens};
