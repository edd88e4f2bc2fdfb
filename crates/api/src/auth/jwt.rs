//! Bearer token verification for REST calls and WebSocket upgrades.
//!
//! Accounts get their tokens from the identity service. This service checks
//! the HS256 signature and expiry, then reloads the user named by `sub`, so
//! a deactivated account or a changed role takes effect on the next request.
//! [`sign_token`] mints compatible tokens for tests and local tooling.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use planpoker_core::types::DbId;
use serde::{Deserialize, Serialize};

const DEFAULT_TOKEN_TTL_MINS: i64 = 60;
const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Payload of a planning-poker bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to.
    pub sub: DbId,
    pub iat: i64,
    pub exp: i64,
}

/// Shared secret and clock rules for token checks.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens minted by [`sign_token`].
    pub token_ttl_mins: i64,
    /// Clock skew tolerated when checking `exp`.
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required), `JWT_TOKEN_TTL_MINS` (default `60`)
    /// and `JWT_LEEWAY_SECS` (default `30`).
    ///
    /// # Panics
    ///
    /// On a missing or empty secret, or a value that does not parse.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let token_ttl_mins = std::env::var("JWT_TOKEN_TTL_MINS")
            .map(|v| v.parse().expect("JWT_TOKEN_TTL_MINS must be a whole number"))
            .unwrap_or(DEFAULT_TOKEN_TTL_MINS);
        let leeway_secs = std::env::var("JWT_LEEWAY_SECS")
            .map(|v| v.parse().expect("JWT_LEEWAY_SECS must be a whole number"))
            .unwrap_or(DEFAULT_LEEWAY_SECS);

        Self {
            secret,
            token_ttl_mins,
            leeway_secs,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation
    }
}

/// Mint a token for `user_id` that expires after the configured TTL.
pub fn sign_token(user_id: DbId, config: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat,
        exp: iat + config.token_ttl_mins * 60,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry and return the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, leeway_secs: u64) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            token_ttl_mins: 60,
            leeway_secs,
        }
    }

    fn token_expired_secs_ago(secs: i64, config: &JwtConfig) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 5,
            iat: now - 3600,
            exp: now - secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn signed_token_names_the_user() {
        let config = config("facilitator-secret", 30);
        let token = sign_token(42, &config).unwrap();

        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn leeway_covers_small_clock_skew_only() {
        let lenient = config("facilitator-secret", 30);
        let strict = config("facilitator-secret", 0);

        let just_expired = token_expired_secs_ago(10, &lenient);
        assert!(validate_token(&just_expired, &lenient).is_ok());
        assert!(validate_token(&just_expired, &strict).is_err());

        let long_expired = token_expired_secs_ago(300, &lenient);
        assert!(validate_token(&long_expired, &lenient).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = sign_token(1, &config("room-a", 30)).unwrap();
        assert!(validate_token(&token, &config("room-b", 30)).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let config = config("facilitator-secret", 30);
        assert!(validate_token("not-a-jwt", &config).is_err());
        assert!(validate_token("", &config).is_err());
    }
}
