use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Item Models =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
}

/// Request body for creating or replacing an item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemPayload {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Validated item fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
}

impl ItemPayload {
    pub fn validate(&self) -> Result<NewItem, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Item name must not be empty".to_string());
        }
        if self.price < 0 {
            return Err("Item price must not be negative".to_string());
        }
        Ok(NewItem {
            name: name.to_string(),
            price: self.price,
            description: self.description.clone(),
        })
    }
}

impl NewItem {
    pub fn into_item(self, id: i32) -> Item {
        Item {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
        }
    }
}

/// Listing filters. Every bound is optional; a bound of 0 is a real bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring of the item name.
    pub name: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(name) = &self.name {
            if !item.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if item.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if item.price > max {
                return false;
            }
        }
        true
    }
}

// ===== Response Models =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}
