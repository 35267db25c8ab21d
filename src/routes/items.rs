//! Item CRUD endpoints.
//!
//! Reads are public. Create, update and delete take an
//! [`AuthenticatedIdentity`] guard, so a request without a valid bearer
//! token is refused before the handler body runs.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post, put};
use rocket_okapi::openapi;

use crate::auth::AuthenticatedIdentity;
use crate::error::ApiError;
use crate::models::{Item, ItemPayload, MessageResponse};
use crate::routes::params::ItemFilterParams;
use crate::storage::SharedItemRepository;

/// List items, optionally filtered by name and an inclusive price range.
#[openapi(tag = "Items")]
#[get("/items?<params..>")]
pub async fn list_items(
    items: &State<SharedItemRepository>,
    params: ItemFilterParams,
) -> Result<Json<Vec<Item>>, ApiError> {
    let found = items.list(&params.to_filter()).await?;
    Ok(Json(found))
}

/// Fetch one item by id.
#[openapi(tag = "Items")]
#[get("/items/<item_id>")]
pub async fn get_item(
    items: &State<SharedItemRepository>,
    item_id: i32,
) -> Result<Json<Item>, ApiError> {
    Ok(Json(items.get(item_id).await?))
}

/// Create an item. Requires a bearer token.
#[openapi(tag = "Items")]
#[post("/items", data = "<payload>")]
pub async fn create_item(
    identity: AuthenticatedIdentity,
    items: &State<SharedItemRepository>,
    payload: Json<ItemPayload>,
) -> Result<status::Custom<Json<Item>>, ApiError> {
    let new_item = payload.validate().map_err(ApiError::BadRequest)?;
    let created = items.create(&new_item).await?;

    log::info!("user '{}' created item {}", identity.username, created.id);

    Ok(status::Custom(Status::Created, Json(created)))
}

/// Replace an item's name, price and description. Requires a bearer token.
#[openapi(tag = "Items")]
#[put("/items/<item_id>", data = "<payload>")]
pub async fn update_item(
    identity: AuthenticatedIdentity,
    items: &State<SharedItemRepository>,
    item_id: i32,
    payload: Json<ItemPayload>,
) -> Result<Json<Item>, ApiError> {
    let new_item = payload.validate().map_err(ApiError::BadRequest)?;
    let updated = items.update(item_id, &new_item).await?;

    log::info!("user '{}' updated item {}", identity.username, updated.id);

    Ok(Json(updated))
}

/// Delete an item. Requires a bearer token.
#[openapi(tag = "Items")]
#[delete("/items/<item_id>")]
pub async fn delete_item(
    identity: AuthenticatedIdentity,
    items: &State<SharedItemRepository>,
    item_id: i32,
) -> Result<Json<MessageResponse>, ApiError> {
    items.delete(item_id).await?;

    log::info!("user '{}' deleted item {}", identity.username, item_id);

    Ok(Json(MessageResponse {
        message: format!("Item {item_id} deleted successfully"),
    }))
}
