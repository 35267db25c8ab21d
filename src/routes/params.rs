//! Query parameter helpers for the item listing endpoint.
//!
//! The struct follows Rocket's `FromForm` conventions and derives
//! `JsonSchema` so the generated OpenAPI document lists every filter.

use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::models::ItemFilter;

/// Filters accepted by `GET /items`. Absent parameters do not filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, rocket::form::FromForm, JsonSchema)]
pub struct ItemFilterParams {
    /// Case-insensitive substring matched against the item name.
    pub name: Option<String>,
    /// Inclusive lower price bound. `0` is a valid bound.
    pub min_price: Option<i64>,
    /// Inclusive upper price bound. `0` is a valid bound.
    pub max_price: Option<i64>,
}

impl ItemFilterParams {
    /// Name filter with surrounding whitespace removed; blank means absent.
    pub fn normalized_name(&self) -> Option<String> {
        self.name.as_ref().and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    pub fn to_filter(&self) -> ItemFilter {
        ItemFilter {
            name: self.normalized_name(),
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }
}
