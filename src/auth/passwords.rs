use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthConfig, AuthError, AuthResult};

const SALT_LEN: usize = 16;
const DECOY_PASSWORD: &str = "items-api-decoy-password";

pub const DEFAULT_M_COST_KIB: u32 = 19 * 1024; // 19 MiB
pub const DEFAULT_T_COST: u32 = 2;
pub const DEFAULT_P_COST: u32 = 1;

/// Argon2id hashing for stored credentials. Output is a PHC string carrying
/// the algorithm, version, cost parameters and salt.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl PasswordService {
    pub fn new() -> AuthResult<Self> {
        Self::with_cost(DEFAULT_M_COST_KIB, DEFAULT_T_COST, DEFAULT_P_COST)
    }

    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::with_cost(
            config.argon2_m_cost_kib,
            config.argon2_t_cost,
            config.argon2_p_cost,
        )
    }

    pub fn with_cost(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(m_cost_kib);
        builder.t_cost(t_cost);
        builder.p_cost(p_cost);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = hash_with(&argon2, DECOY_PASSWORD)?;
        Ok(Self { argon2, decoy_hash })
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        hash_with(&self.argon2, password)
    }

    /// A stored-hash stand-in at the configured cost, for accounts that do
    /// not exist or cannot log in.
    pub fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }

    /// Checks `password` against a stored PHC string using the parameters
    /// embedded in it. Any failure, including an unparseable hash, is `false`.
    pub fn verify_password(&self, password: &str, encoded: &str) -> bool {
        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("stored password hash could not be parsed: {}", err);
                return false;
            }
        };
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(err) => {
                log::warn!("password verification failed internally: {}", err);
                false
            }
        }
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> AuthResult<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthError::from)?
        .to_string();
    Ok(hash)
}
