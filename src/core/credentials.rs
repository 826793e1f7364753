//! Password hashing and signed bearer tokens.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::core::errors::AuthError;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// Returns false on mismatch and on a stored hash that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Identity payload carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    claims: Claims,
    iat: i64,
    exp: i64,
}

/// HS256 token issuer/verifier keyed by the process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        TokenCodec {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, claims: &Claims) -> anyhow::Result<String> {
        self.issue_at(claims, Utc::now())
    }

    pub fn issue_at(&self, claims: &Claims, now: DateTime<Utc>) -> anyhow::Result<String> {
        let payload = TokenPayload {
            claims: claims.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Checks the signature, then expiry against `now` with no leeway.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<TokenPayload>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims {
            id: "5b7c8e8e-6a43-4b0e-9f55-1d3cb7c2b9a1".to_string(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
        }
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify_password("anything", "not a phc string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn token_verifies_before_expiry() {
        let codec = TokenCodec::new("secret", Duration::hours(1));
        let issued = Utc::now();
        let token = codec.issue_at(&claims(), issued).unwrap();

        let decoded = codec.verify_at(&token, issued + Duration::minutes(59)).unwrap();
        assert_eq!(decoded, claims());
        assert_eq!(codec.verify(&token).unwrap(), claims());
    }

    #[test]
    fn token_rejected_after_expiry() {
        let codec = TokenCodec::new("secret", Duration::hours(1));
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.issue_at(&claims(), issued).unwrap();

        assert_eq!(codec.verify(&token), Err(AuthError::InvalidToken));
        assert_eq!(
            codec.verify_at(&token, issued + Duration::hours(1)),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn token_rejected_with_other_secret() {
        let token = TokenCodec::new("secret", Duration::hours(1))
            .issue(&claims())
            .unwrap();
        let other = TokenCodec::new("another-secret", Duration::hours(1));
        assert_eq!(other.verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn tampered_token_rejected() {
        let codec = TokenCodec::new("secret", Duration::hours(1));
        let token = codec.issue(&claims()).unwrap();

        let forged = codec
            .issue(&Claims {
                username: "mallory".to_string(),
                ..claims()
            })
            .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert_eq!(codec.verify(&tampered), Err(AuthError::InvalidToken));
        assert_eq!(codec.verify("not.a.token"), Err(AuthError::InvalidToken));
    }
}
