use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use items_api::auth::{AuthConfig, AuthError, CredentialStore, PasswordService, PgCredentialStore};
use items_api::db;

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Create an items API user account")]
struct Args {
    /// Username for the account (case sensitive).
    #[arg(long)]
    username: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let username = args.username.trim();

    if username.is_empty() || args.password.is_empty() {
        writeln!(io::stderr(), "error: username and password are required")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    // Only the Argon2 cost settings apply here; tokens are never signed.
    let config = AuthConfig::from_lookup(|key| match key {
        "ITEMS_JWT_SECRET" => Some("unused-by-create-user".to_string()),
        _ => std::env::var(key).ok(),
    })?;
    let password_service = PasswordService::from_config(&config)?;
    let password_hash = password_service.hash_password(&args.password)?;

    let store = PgCredentialStore::new(pool);
    match store.register(username, &password_hash).await {
        Ok(user) => {
            println!("Created user '{}' with id {}", user.username, user.id);
            Ok(())
        }
        Err(AuthError::DuplicateUsername) => {
            writeln!(
                io::stderr(),
                "error: a user named '{username}' already exists."
            )?;
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
