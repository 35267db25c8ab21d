use std::fmt;

use crate::auth::passwords::{DEFAULT_M_COST_KIB, DEFAULT_P_COST, DEFAULT_T_COST};
use crate::auth::{AuthError, AuthResult};

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Authentication configuration loaded from environment variables.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub argon2_m_cost_kib: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
}

impl AuthConfig {
    /// Default settings around the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            argon2_m_cost_kib: DEFAULT_M_COST_KIB,
            argon2_t_cost: DEFAULT_T_COST,
            argon2_p_cost: DEFAULT_P_COST,
        }
    }

    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("ITEMS_JWT_SECRET")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::Config("ITEMS_JWT_SECRET is required".into()))?;
        if jwt_secret.len() < RECOMMENDED_SECRET_LEN {
            log::warn!(
                "ITEMS_JWT_SECRET is shorter than {} bytes; use a longer random secret in production",
                RECOMMENDED_SECRET_LEN
            );
        }

        let access_token_ttl_secs =
            parse_or(&lookup, "ITEMS_ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        if access_token_ttl_secs <= 0 {
            return Err(AuthError::Config(
                "ITEMS_ACCESS_TOKEN_TTL_SECS must be positive".into(),
            ));
        }

        Ok(Self {
            jwt_secret,
            access_token_ttl_secs,
            argon2_m_cost_kib: parse_or(&lookup, "ITEMS_ARGON2_M_COST_KIB", DEFAULT_M_COST_KIB)?,
            argon2_t_cost: parse_or(&lookup, "ITEMS_ARGON2_T_COST", DEFAULT_T_COST)?,
            argon2_p_cost: parse_or(&lookup, "ITEMS_ARGON2_P_COST", DEFAULT_P_COST)?,
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("argon2_m_cost_kib", &self.argon2_m_cost_kib)
            .field("argon2_t_cost", &self.argon2_t_cost)
            .field("argon2_p_cost", &self.argon2_p_cost)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AuthResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AuthError::Config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}
