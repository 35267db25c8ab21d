use chrono::{Duration, Utc};
use items_api::auth::JwtService;
use items_api::auth::responses::{LoginResponse, UserSummary};
use items_api::auth::routes::AuthErrorResponse;
use items_api::error::ErrorResponse;
use items_api::models::{Item, MessageResponse};
use items_api::test_support::{TEST_JWT_SECRET, TestRocketBuilder, test_auth_config};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::json;

async fn memory_client() -> Client {
    TestRocketBuilder::new()
        .mount_all_api_routes()
        .with_memory_stores()
        .async_client()
        .await
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

async fn register(client: &Client, username: &str, password: &str) -> Status {
    client
        .post("/api/v1/auth/register")
        .json(&json!({ "username": username, "password": password }))
        .dispatch()
        .await
        .status()
}

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post("/api/v1/auth/login")
        .json(&json!({ "username": username, "password": password }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let payload: LoginResponse = response.into_json().await.expect("login payload");
    assert_eq!(payload.token_type, "bearer");
    payload.access_token
}

async fn create_item(client: &Client, token: &str, name: &str, price: i64) -> Item {
    let response = client
        .post("/api/v1/items")
        .header(bearer(token))
        .json(&json!({ "name": name, "price": price }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    response.into_json().await.expect("item payload")
}

async fn assert_unauthorized(client: &Client, header: Option<Header<'static>>, expected: &str) {
    let mut request = client
        .post("/api/v1/items")
        .json(&json!({ "name": "Widget", "price": 10 }));
    if let Some(header) = header {
        request = request.header(header);
    }

    let response = request.dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(
        response.headers().get_one("WWW-Authenticate"),
        Some("Bearer")
    );

    let payload: AuthErrorResponse = response.into_json().await.expect("error payload");
    assert_eq!(payload.status, 401);
    assert_eq!(payload.message, expected);
}

#[tokio::test]
async fn register_returns_created_summary() {
    let client = memory_client().await;

    let response = client
        .post("/api/v1/auth/register")
        .json(&json!({ "username": "bob", "password": "pw123" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let user: UserSummary = response.into_json().await.expect("user payload");
    assert_eq!(user.username, "bob");
    assert!(user.is_active);

    let body = json!(user);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let client = memory_client().await;

    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);

    let response = client
        .post("/api/v1/auth/register")
        .json(&json!({ "username": "bob", "password": "other" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    let payload: AuthErrorResponse = response.into_json().await.expect("error payload");
    assert_eq!(payload.message, "Username already registered");
}

#[tokio::test]
async fn register_rejects_blank_username() {
    let client = memory_client().await;

    assert_eq!(register(&client, "   ", "pw123").await, Status::BadRequest);
    assert_eq!(register(&client, "bob", "").await, Status::BadRequest);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let client = memory_client().await;
    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);

    for (username, password) in [("bob", "wrong"), ("nobody", "pw123")] {
        let response = client
            .post("/api/v1/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let payload: AuthErrorResponse = response.into_json().await.expect("error payload");
        assert_eq!(payload.message, "Incorrect username or password");
    }
}

#[tokio::test]
async fn token_grants_item_creation() {
    let client = memory_client().await;
    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);
    let token = login(&client, "bob", "pw123").await;

    let item = create_item(&client, &token, "Widget", 10).await;
    assert!(item.id > 0);
    assert_eq!(item.name, "Widget");
    assert_eq!(item.price, 10);
    assert_eq!(item.description, None);

    let response = client
        .get(format!("/api/v1/items/{}", item.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let fetched: Item = response.into_json().await.expect("item payload");
    assert_eq!(fetched, item);
}

#[tokio::test]
async fn missing_or_bad_credentials_are_rejected_by_kind() {
    let client = memory_client().await;

    assert_unauthorized(&client, None, "Not authenticated").await;
    assert_unauthorized(
        &client,
        Some(Header::new("Authorization", "Basic Ym9iOnB3MTIz")),
        "Not authenticated",
    )
    .await;
    assert_unauthorized(&client, Some(bearer("not-a-token")), "Invalid token").await;

    let tokens = JwtService::from_config(&test_auth_config(TEST_JWT_SECRET)).expect("jwt service");
    let expired = tokens
        .issue_access_token_at("bob", Utc::now() - Duration::hours(2))
        .expect("token");
    assert_unauthorized(&client, Some(bearer(&expired.token)), "Token has expired").await;

    let foreign = JwtService::from_config(&test_auth_config(
        "a-completely-different-secret-0123456789",
    ))
    .expect("jwt service")
    .issue_access_token("bob")
    .expect("token");
    assert_unauthorized(
        &client,
        Some(bearer(&foreign.token)),
        "Invalid token signature",
    )
    .await;

    let response = client.get("/api/v1/items").dispatch().await;
    let items: Vec<Item> = response.into_json().await.expect("item list");
    assert!(items.is_empty(), "rejected requests must not create items");
}

#[tokio::test]
async fn reads_are_public_and_filterable() {
    let client = memory_client().await;
    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);
    let token = login(&client, "bob", "pw123").await;

    create_item(&client, &token, "Free Sample", 0).await;
    create_item(&client, &token, "Widget", 10).await;
    create_item(&client, &token, "Gadget", 25).await;
    create_item(&client, &token, "widget deluxe", 40).await;

    let names = |items: Vec<Item>| items.into_iter().map(|item| item.name).collect::<Vec<_>>();

    let response = client.get("/api/v1/items").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let all: Vec<Item> = response.into_json().await.expect("item list");
    assert_eq!(all.len(), 4);

    let response = client.get("/api/v1/items?name=WIDGET").dispatch().await;
    let matched: Vec<Item> = response.into_json().await.expect("item list");
    assert_eq!(names(matched), vec!["Widget", "widget deluxe"]);

    let response = client
        .get("/api/v1/items?min_price=10&max_price=25")
        .dispatch()
        .await;
    let ranged: Vec<Item> = response.into_json().await.expect("item list");
    assert_eq!(names(ranged), vec!["Widget", "Gadget"]);

    let response = client.get("/api/v1/items?max_price=0").dispatch().await;
    let free: Vec<Item> = response.into_json().await.expect("item list");
    assert_eq!(names(free), vec!["Free Sample"]);

    let response = client.get("/api/v1/items?min_price=0").dispatch().await;
    let from_zero: Vec<Item> = response.into_json().await.expect("item list");
    assert_eq!(from_zero.len(), 4);
}

#[tokio::test]
async fn update_and_delete_require_token_and_existing_item() {
    let client = memory_client().await;
    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);
    let token = login(&client, "bob", "pw123").await;
    let item = create_item(&client, &token, "Widget", 10).await;

    let response = client
        .put(format!("/api/v1/items/{}", item.id))
        .json(&json!({ "name": "Widget", "price": 12, "description": "blue" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .put(format!("/api/v1/items/{}", item.id))
        .header(bearer(&token))
        .json(&json!({ "name": "Widget", "price": 12, "description": "blue" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Item = response.into_json().await.expect("item payload");
    assert_eq!(updated.id, item.id);
    assert_eq!(updated.price, 12);
    assert_eq!(updated.description.as_deref(), Some("blue"));

    let response = client
        .delete(format!("/api/v1/items/{}", item.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .delete(format!("/api/v1/items/{}", item.id))
        .header(bearer(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let message: MessageResponse = response.into_json().await.expect("message payload");
    assert_eq!(
        message.message,
        format!("Item {} deleted successfully", item.id)
    );

    let response = client
        .get(format!("/api/v1/items/{}", item.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    let error: ErrorResponse = response.into_json().await.expect("error payload");
    assert_eq!(error.error, "NotFound");
    assert_eq!(error.message, format!("Item {} not found", item.id));

    let response = client
        .delete(format!("/api/v1/items/{}", item.id))
        .header(bearer(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn invalid_item_payload_is_a_bad_request() {
    let client = memory_client().await;
    assert_eq!(register(&client, "bob", "pw123").await, Status::Created);
    let token = login(&client, "bob", "pw123").await;

    let response = client
        .post("/api/v1/items")
        .header(bearer(&token))
        .json(&json!({ "name": "  ", "price": 10 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post("/api/v1/items")
        .header(bearer(&token))
        .json(&json!({ "name": "Widget", "price": -1 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}
