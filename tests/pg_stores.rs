use std::sync::Arc;

use items_api::auth::{AuthError, CredentialStore, PgCredentialStore};
use items_api::models::{ItemFilter, NewItem};
use items_api::storage::{ItemRepository, PgItemRepository, StorageError};
use items_api::test_support::{TestDatabase, TestDatabaseError, TestRocketBuilder};
use rocket::http::{Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::json;
use tokio::task::JoinSet;

async fn provision(test_name: &str) -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping {test_name}: TEST_DATABASE_URL not set");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn new_item(name: &str, price: i64) -> NewItem {
    NewItem {
        name: name.to_string(),
        price,
        description: None,
    }
}

#[tokio::test]
async fn pg_credentials_reject_duplicates() {
    let Some(test_db) = provision("pg credential duplicate test").await else {
        return;
    };
    let store = PgCredentialStore::new(test_db.pool_clone());

    let user = store.register("bob", "$argon2id$stub").await.expect("first insert");
    assert_eq!(user.username, "bob");
    assert!(user.is_active);

    let err = store
        .register("bob", "$argon2id$other")
        .await
        .expect_err("second insert must fail");
    assert!(matches!(err, AuthError::DuplicateUsername));

    // Usernames are case sensitive.
    store.register("Bob", "$argon2id$stub").await.expect("distinct name");

    let found = store
        .find_by_username("bob")
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(found.id, user.id);
    assert_eq!(found.password_hash, "$argon2id$stub");
    assert!(store.find_by_username("carol").await.expect("lookup").is_none());

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn pg_concurrent_registrations_admit_one() {
    let Some(test_db) = provision("pg concurrent registration test").await else {
        return;
    };
    let store = Arc::new(PgCredentialStore::new(test_db.pool_clone()));

    let mut tasks = JoinSet::new();
    for n in 0..50 {
        let store = Arc::clone(&store);
        tasks.spawn(async move { store.register("racer", &format!("hash-{n}")).await });
    }

    let mut created = 0;
    let mut conflicts = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("task completes") {
            Ok(_) => created += 1,
            Err(AuthError::DuplicateUsername) => conflicts += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 49);

    drop(store);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn pg_items_filter_update_and_delete() {
    let Some(test_db) = provision("pg item repository test").await else {
        return;
    };
    let repo = PgItemRepository::new(test_db.pool_clone());

    let free = repo.create(&new_item("Free Sample", 0)).await.expect("create");
    let widget = repo.create(&new_item("Widget", 10)).await.expect("create");
    repo.create(&new_item("100%_off", 5)).await.expect("create");

    let by_name = repo
        .list(&ItemFilter {
            name: Some("WIDG".to_string()),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(by_name, vec![widget.clone()]);

    let literal_percent = repo
        .list(&ItemFilter {
            name: Some("%_".to_string()),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(literal_percent.len(), 1);
    assert_eq!(literal_percent[0].name, "100%_off");

    let zero_cap = repo
        .list(&ItemFilter {
            max_price: Some(0),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(zero_cap, vec![free.clone()]);

    let mut replacement = new_item("Widget", 12);
    replacement.description = Some("blue".to_string());
    let updated = repo.update(widget.id, &replacement).await.expect("update");
    assert_eq!(updated.price, 12);
    assert_eq!(updated.description.as_deref(), Some("blue"));

    repo.delete(widget.id).await.expect("delete");
    assert!(matches!(
        repo.get(widget.id).await,
        Err(StorageError::NotFound(id)) if id == widget.id
    ));
    assert!(matches!(
        repo.update(widget.id, &replacement).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete(widget.id).await,
        Err(StorageError::NotFound(_))
    ));

    test_db.close().await.expect("failed to drop test database");
}

/// Register, log in, create and find an item.
async fn register_login_and_create(client: &Client) {
    let response = client
        .post("/api/v1/auth/register")
        .json(&json!({ "username": "bob", "password": "pw123" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let response = client
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "bob", "password": "pw123" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let login: serde_json::Value = response.into_json().await.expect("login payload");
    let token = login["access_token"].as_str().expect("token").to_string();

    let response = client
        .post("/api/v1/items")
        .header(Header::new("Authorization", format!("Bearer {token}")))
        .json(&json!({ "name": "Widget", "price": 10 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let response = client.get("/api/v1/items?name=widget").dispatch().await;
    let items: serde_json::Value = response.into_json().await.expect("item list");
    assert_eq!(items.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn postgres_backed_api_round_trip() {
    let Some(test_db) = provision("postgres api test").await else {
        return;
    };

    let client = TestRocketBuilder::new()
        .mount_all_api_routes()
        .with_postgres_stores(test_db.pool_clone())
        .async_client()
        .await;

    register_login_and_create(&client).await;

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}
