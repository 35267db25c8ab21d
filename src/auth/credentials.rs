use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rocket_db_pools::sqlx::{self, FromRow, PgPool};

use crate::auth::{AuthError, AuthResult};

/// A registered account. The hash never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub type SharedCredentialStore = Arc<dyn CredentialStore>;

/// Persistence for usernames and password hashes.
///
/// `register` must be a single atomic check-and-insert: two concurrent calls
/// with the same username yield one `Ok` and one
/// [`AuthError::DuplicateUsername`].
#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn register(&self, username: &str, password_hash: &str) -> AuthResult<User>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[rocket::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn register(&self, username: &str, password_hash: &str) -> AuthResult<User> {
        // Uniqueness is enforced by users_username_key, not by a prior SELECT.
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, is_active, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AuthError::DuplicateUsername
            } else {
                AuthError::from(err)
            }
        })
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_active, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.code().map(|code| code == "23505").unwrap_or(false)
    )
}

/// Process-local store used by the `memory` storage backend and in tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, User>,
    next_id: AtomicI32,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[rocket::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn register(&self, username: &str, password_hash: &str) -> AuthResult<User> {
        // The entry holds the shard lock across the existence check and insert.
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateUsername),
            Entry::Vacant(slot) => {
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    is_active: true,
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }
}
