//! JWT issuing and verification
//!
//! Tokens are HS256, carrying the account id in `sub`. Session issuance
//! lives with the external identity provider; this server only needs to
//! mint tokens for its own flows and verify whatever arrives.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,
    pub email: Option<String>,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Issued at, unix seconds
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Mint a token for an account
    pub fn issue(
        &self,
        account_id: Uuid,
        email: Option<&str>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_with_expiry(account_id, email, Duration::hours(self.expiry_hours))
    }

    fn issue_with_expiry(
        &self,
        account_id: Uuid,
        email: Option<&str>,
        expiry: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: account_id,
            email: email.map(String::from),
            exp: (now + expiry).unix_timestamp(),
            iat: now.unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let manager = JwtManager::new("test-jwt-secret", 24);
        let account_id = Uuid::new_v4();

        let token = manager.issue(account_id, Some("mira@example.com")).unwrap();
        let claims = manager.verify(&token).unwrap();

        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.email.as_deref(), Some("mira@example.com"));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let manager = JwtManager::new("test-jwt-secret", 24);
        let token = manager.issue(Uuid::new_v4(), None).unwrap();

        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);
        tampered.push_str("xx");

        assert!(manager.verify(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = JwtManager::new("secret-a", 24);
        let verifier = JwtManager::new("secret-b", 24);

        let token = issuer.issue(Uuid::new_v4(), None).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = JwtManager::new("test-jwt-secret", 24);
        let token = manager
            .issue_with_expiry(Uuid::new_v4(), None, Duration::hours(-1))
            .unwrap();

        assert!(manager.verify(&token).is_err());
    }
}
