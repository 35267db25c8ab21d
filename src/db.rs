use rocket_db_pools::Database;
use rocket_db_pools::sqlx::{self, PgPool, migrate::Migrator};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Database)]
#[database("items_db")]
pub struct ItemsDb(sqlx::PgPool);

/// Apply pending migrations. Already-applied migrations are skipped after
/// their checksums are verified.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}

pub fn migrator() -> &'static Migrator {
    &MIGRATOR
}
