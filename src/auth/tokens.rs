//! Access/refresh token issuance and verification.
//!
//! Access tokens are short-lived (minutes), refresh tokens long-lived
//! (days), each signed with its own secret. Verification fails closed:
//! expired, malformed, and mis-signed tokens all come back as errors the
//! boundary maps to 401.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per-issue id; makes two tokens minted in the same second distinct.
    pub jti: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
        }
    }

    pub fn issue_access(&self, user_id: &str, username: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.access_encoding).map_err(|_| TokenError::Invalid)
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding).map_err(|_| TokenError::Invalid)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        Self::verify::<AccessClaims>(token, &self.access_decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        Self::verify::<RefreshClaims>(token, &self.refresh_decoding)
    }

    fn verify<T: serde::de::DeserializeOwned>(
        token: &str,
        key: &DecodingKey,
    ) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        // No clock leeway: an expired credential is expired.
        validation.leeway = 0;

        decode::<T>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(access_minutes: i64) -> TokenService {
        TokenService::new(&AuthConfig {
            access_token_secret: "access-test-secret".to_string(),
            refresh_token_secret: "refresh-test-secret".to_string(),
            access_token_ttl_minutes: access_minutes,
            refresh_token_ttl_days: 10,
            secure_cookies: true,
        })
    }

    #[test]
    fn access_token_round_trip() {
        let svc = service(15);
        let token = svc.issue_access("u-1", "alice").unwrap();
        let claims = svc.verify_access(&token).unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let svc = service(-5);
        let token = svc.issue_access("u-1", "alice").unwrap();

        assert_eq!(svc.verify_access(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn tokens_are_not_interchangeable_across_secrets() {
        let svc = service(15);
        let refresh = svc.issue_refresh("u-1").unwrap();

        // A refresh token must not pass access verification: distinct secrets.
        assert!(svc.verify_access(&refresh).is_err());
    }

    #[test]
    fn garbage_and_tampered_tokens_fail_uniformly() {
        let svc = service(15);

        assert_eq!(
            svc.verify_access("not-a-token").unwrap_err(),
            TokenError::Invalid
        );

        let mut token = svc.issue_access("u-1", "alice").unwrap();
        token.push('x');
        assert_eq!(svc.verify_access(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn repeated_issuance_yields_distinct_refresh_tokens() {
        let svc = service(15);
        let a = svc.issue_refresh("u-1").unwrap();
        let b = svc.issue_refresh("u-1").unwrap();

        assert_ne!(a, b);
    }
}
