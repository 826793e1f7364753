use chrono::Duration;
use thiserror::Error;

pub const JWT_SECRET_VAR: &str = "OPINIONER_JWT_SECRET";
pub const TOKEN_TTL_VAR: &str = "OPINIONER_TOKEN_TTL_SECS";
pub const BIND_VAR: &str = "OPINIONER_BIND";

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// How many levels of comments are resolved when a post is populated.
pub const POPULATE_DEPTH: usize = 1;

pub const DEFAULT_IMAGE_URL: &str =
    "https://res.cloudinary.com/dn6wkankc/image/upload/v1603234307/opinioner/e0xyyzy5xktlumbjhl1c.jpg";

pub const USERS_COLLECTION: &str = "user";
pub const POSTS_COLLECTION: &str = "post";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty signing secret")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup(JWT_SECRET_VAR)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret(JWT_SECRET_VAR))?;

        let ttl_secs = lookup(TOKEN_TTL_VAR)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        let bind_addr = lookup(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Config {
            jwt_secret,
            token_ttl: Duration::seconds(ttl_secs),
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn secret_is_required() {
        let env = vars(&[]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecret(JWT_SECRET_VAR));

        let env = vars(&[(JWT_SECRET_VAR, "   ")]);
        assert!(Config::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn defaults_apply() {
        let env = vars(&[(JWT_SECRET_VAR, "s3cret")]);
        let config = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl, Duration::hours(1));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn ttl_override_and_garbage() {
        let env = vars(&[(JWT_SECRET_VAR, "s"), (TOKEN_TTL_VAR, "120")]);
        let config = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.token_ttl, Duration::seconds(120));

        let env = vars(&[(JWT_SECRET_VAR, "s"), (TOKEN_TTL_VAR, "soon")]);
        let config = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.token_ttl, Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
    }
}
