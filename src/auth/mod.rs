//! Authentication module: configuration, credential storage, password
//! hashing, token minting, the Rocket request guard that gates mutating
//! routes, and the registration/login handlers.

use std::sync::Arc;

pub mod config;
pub mod credentials;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;

pub use config::AuthConfig;
pub use credentials::{
    CredentialStore, MemoryCredentialStore, PgCredentialStore, SharedCredentialStore, User,
};
pub use error::{AuthError, AuthResult, TokenError};
pub use guards::AuthenticatedIdentity;
pub use jwt::{JwtService, SignedAccessToken};
pub use passwords::PasswordService;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub jwt_service: Arc<JwtService>,
    pub credentials: SharedCredentialStore,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        jwt_service: JwtService,
        credentials: SharedCredentialStore,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            jwt_service: Arc::new(jwt_service),
            credentials,
        }
    }

    pub fn from_config(config: AuthConfig, credentials: SharedCredentialStore) -> AuthResult<Self> {
        let password_service = PasswordService::from_config(&config)?;
        let jwt_service = JwtService::from_config(&config)?;
        Ok(Self::new(config, password_service, jwt_service, credentials))
    }

    /// Hash `password` and create the account in one store call.
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<User> {
        let password_hash = self.password_service.hash_password(password)?;
        self.credentials.register(username, &password_hash).await
    }

    /// Every failure cause collapses into [`AuthError::InvalidCredentials`]
    /// so callers cannot tell unknown users from wrong passwords.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let user = self
            .credentials
            .find_by_username(username)
            .await?
            .filter(|user| user.is_active);

        // Unknown and inactive accounts check against the decoy so every
        // failure pays one Argon2 verification.
        let stored_hash = user.as_ref().map_or(self.password_service.decoy_hash(), |user| {
            user.password_hash.as_str()
        });
        let verified = self.password_service.verify_password(password, stored_hash);

        match user {
            Some(user) if verified => Ok(user),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthResult<SignedAccessToken> {
        let user = self.authenticate(username, password).await?;
        self.jwt_service.issue_access_token(&user.username)
    }
}
