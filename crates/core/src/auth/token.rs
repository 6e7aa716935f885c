use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::document::UserId;

/// Claims carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The signed-in user's id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Issue)
    }

    /// Verify signature and expiry, returning the user the token was issued to.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map_err(AuthError::InvalidToken)?;
        UserId::parse(&data.claims.sub).map_err(|_| AuthError::InvalidSubject)
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let tokens = SessionTokens::new("test-secret", Duration::hours(1));
        let user = UserId::new();
        let token = tokens.issue(user).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = SessionTokens::new("one", Duration::hours(1));
        let verifier = SessionTokens::new("two", Duration::hours(1));
        let token = issuer.issue(UserId::new()).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the validator's default 60s leeway.
        let tokens = SessionTokens::new("s", Duration::minutes(-5));
        let token = tokens.issue(UserId::new()).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let tokens = SessionTokens::new("s", Duration::hours(1));
        assert!(tokens.verify("abc.def.ghi").is_err());
    }
}
