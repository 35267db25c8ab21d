use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::RwLock;
use rocket_db_pools::sqlx::{self, PgPool};

use crate::models::{Item, ItemFilter, NewItem};
use crate::storage::{StorageError, StorageResult};

pub type SharedItemRepository = Arc<dyn ItemRepository>;

#[rocket::async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create(&self, item: &NewItem) -> StorageResult<Item>;

    async fn get(&self, id: i32) -> StorageResult<Item>;

    /// Matching items ordered by id.
    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>>;

    /// Replaces every field of the item.
    async fn update(&self, id: i32, item: &NewItem) -> StorageResult<Item>;

    async fn delete(&self, id: i32) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl ItemRepository for PgItemRepository {
    async fn create(&self, item: &NewItem) -> StorageResult<Item> {
        let created = sqlx::query_as::<_, Item>(
            "INSERT INTO items (name, price, description) VALUES ($1, $2, $3) RETURNING id, name, price, description",
        )
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get(&self, id: i32) -> StorageResult<Item> {
        sqlx::query_as::<_, Item>("SELECT id, name, price, description FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound(id))
    }

    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>> {
        let name_pattern = filter.name.as_deref().map(escape_like);

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, price, description
            FROM items
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::BIGINT IS NULL OR price >= $2)
              AND ($3::BIGINT IS NULL OR price <= $3)
            ORDER BY id
            "#,
        )
        .bind(name_pattern)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update(&self, id: i32, item: &NewItem) -> StorageResult<Item> {
        sqlx::query_as::<_, Item>(
            "UPDATE items SET name = $1, price = $2, description = $3 WHERE id = $4 RETURNING id, name, price, description",
        )
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }
}

/// Escape LIKE metacharacters so user input only ever matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Debug, Default)]
pub struct MemoryItemRepository {
    items: RwLock<BTreeMap<i32, Item>>,
    next_id: AtomicI32,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl ItemRepository for MemoryItemRepository {
    async fn create(&self, item: &NewItem) -> StorageResult<Item> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = item.clone().into_item(id);
        self.items.write().insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i32) -> StorageResult<Item> {
        self.items
            .read()
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound(id))
    }

    async fn list(&self, filter: &ItemFilter) -> StorageResult<Vec<Item>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i32, item: &NewItem) -> StorageResult<Item> {
        let mut items = self.items.write();
        let slot = items.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        *slot = item.clone().into_item(id);
        Ok(slot.clone())
    }

    async fn delete(&self, id: i32) -> StorageResult<()> {
        self.items
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound(id))
    }
}
