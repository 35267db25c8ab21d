pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod storage;

use crate::auth::{AuthConfig, AuthState, MemoryCredentialStore, PgCredentialStore, SharedCredentialStore};
use crate::db::ItemsDb;
use crate::request_logger::RequestLogger;
use crate::storage::{
    MemoryItemRepository, PgItemRepository, SharedItemRepository, StorageBackend, UnknownBackend,
};
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, Route};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Every API route, with the generated `openapi.json` alongside.
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        // Health routes
        routes::health::health_check,
        // Auth routes
        auth::routes::register,
        auth::routes::login,
        // Item routes
        routes::items::list_items,
        routes::items::get_item,
        routes::items::create_item,
        routes::items::update_item,
        routes::items::delete_item,
    ]
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    log::info!("starting items API server");

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    let rocket = rocket::build().attach(RequestLogger).attach(cors);

    attach_storage(rocket, StorageBackend::from_env())
        .attach(AdHoc::try_on_ignite(
            "Auth Services",
            |rocket| async move {
                let credentials = rocket.state::<SharedCredentialStore>().cloned();
                let Some(credentials) = credentials else {
                    log::error!("credential store not available; auth services disabled");
                    return Err(rocket);
                };

                match AuthConfig::from_env()
                    .and_then(|config| AuthState::from_config(config, credentials))
                {
                    Ok(state) => {
                        log::info!(
                            "auth services ready (access tokens live {}s)",
                            state.config.access_token_ttl_secs
                        );
                        Ok(rocket.manage(state))
                    }
                    Err(err) => {
                        log::error!("failed to initialise auth services: {}", err);
                        Err(rocket)
                    }
                }
            },
        ))
        .mount("/api/v1", api_routes())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Items API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
        .register("/", routes::catchers::catchers())
}

fn attach_storage(
    rocket: Rocket<Build>,
    backend: Result<StorageBackend, UnknownBackend>,
) -> Rocket<Build> {
    match backend {
        Ok(StorageBackend::Postgres) => rocket
            .attach(ItemsDb::init())
            // Run database migrations on startup
            .attach(AdHoc::try_on_ignite(
                "Run Migrations",
                |rocket| async move {
                    match ItemsDb::fetch(&rocket) {
                        Some(db) => {
                            let pool = (**db).clone();
                            match db::run_migrations(&pool).await {
                                Ok(_) => {
                                    log::info!("database migrations successful");
                                    Ok(rocket)
                                }
                                Err(e) => {
                                    log::error!("database migrations failed: {}", e);
                                    Err(rocket)
                                }
                            }
                        }
                        None => {
                            log::error!("database pool not available for migrations");
                            Err(rocket)
                        }
                    }
                },
            ))
            .attach(AdHoc::try_on_ignite(
                "Manage Postgres Stores",
                |rocket| async move {
                    match ItemsDb::fetch(&rocket) {
                        Some(db) => {
                            let pool = (**db).clone();
                            let credentials = Arc::new(PgCredentialStore::new(pool.clone()));
                            let items = Arc::new(PgItemRepository::new(pool));
                            Ok(manage_stores(rocket, credentials, items))
                        }
                        None => Err(rocket),
                    }
                },
            )),
        Ok(StorageBackend::Memory) => rocket.attach(AdHoc::on_ignite(
            "Manage Memory Stores",
            |rocket| async move {
                log::warn!("using in-memory storage; users and items are lost on shutdown");
                manage_stores(
                    rocket,
                    Arc::new(MemoryCredentialStore::new()),
                    Arc::new(MemoryItemRepository::new()),
                )
            },
        )),
        Err(err) => rocket.attach(AdHoc::try_on_ignite(
            "Storage Backend",
            move |rocket| async move {
                log::error!("{}", err);
                Err(rocket)
            },
        )),
    }
}

fn manage_stores(
    rocket: Rocket<Build>,
    credentials: SharedCredentialStore,
    items: SharedItemRepository,
) -> Rocket<Build> {
    rocket.manage(credentials).manage(items)
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::sync::Arc;

    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::PgPool;

    use crate::auth::{AuthConfig, AuthState, MemoryCredentialStore, PgCredentialStore};
    use crate::request_logger::RequestLogger;
    use crate::routes::catchers::catchers;
    use crate::storage::{MemoryItemRepository, PgItemRepository, SharedItemRepository};

    pub use database::{TestDatabase, TestDatabaseError};

    pub const TEST_JWT_SECRET: &str = "items-api-test-secret-0123456789abcdef";

    /// Auth settings with a cheap Argon2 cost so tests hash quickly.
    pub fn test_auth_config(secret: &str) -> AuthConfig {
        let mut config = AuthConfig::with_secret(secret);
        config.argon2_m_cost_kib = 1024;
        config.argon2_t_cost = 1;
        config.argon2_p_cost = 1;
        config
    }

    pub fn memory_auth_state(secret: &str) -> AuthState {
        AuthState::from_config(test_auth_config(secret), Arc::new(MemoryCredentialStore::new()))
            .expect("test auth state")
    }

    pub fn postgres_auth_state(secret: &str, pool: PgPool) -> AuthState {
        AuthState::from_config(test_auth_config(secret), Arc::new(PgCredentialStore::new(pool)))
            .expect("test auth state")
    }

    pub mod database {
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers::{ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner};
        use testcontainers_modules::postgres::Postgres;
        use thiserror::Error;
        use uuid::Uuid;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("TEST_DATABASE_URL not set")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// A uniquely named, fully migrated database. [`TestDatabase::close`]
        /// drops it again.
        pub struct TestDatabase {
            pool: PgPool,
            server: PgConnectOptions,
            name: String,
            _container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Uses the server named by `TEST_DATABASE_URL`, or a throwaway
            /// Postgres container when `ITEMS_TEST_CONTAINERS=1`.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                    return Self::create(url.parse()?, None).await;
                }
                if !matches!(
                    std::env::var("ITEMS_TEST_CONTAINERS").as_deref(),
                    Ok("1") | Ok("true")
                ) {
                    return Err(TestDatabaseError::MissingUrl);
                }

                let container = Postgres::default().start().await?;
                let server = PgConnectOptions::new()
                    .host(&container.get_host().await?.to_string())
                    .port(container.get_host_port_ipv4(5432).await?)
                    .username("postgres")
                    .password("postgres");
                Self::create(server, Some(container)).await
            }

            async fn create(
                server: PgConnectOptions,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let name = format!("items_test_{}", Uuid::new_v4().simple());

                let admin = admin_pool(&server).await?;
                sqlx::query(&format!("CREATE DATABASE \"{name}\""))
                    .execute(&admin)
                    .await?;
                admin.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect_with(server.clone().database(&name))
                    .await?;
                crate::db::migrator().run(&pool).await?;

                Ok(Self {
                    pool,
                    server,
                    name,
                    _container: container,
                })
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool.clone()
            }

            /// Closes every pool handle, then drops the database.
            pub async fn close(self) -> Result<(), TestDatabaseError> {
                self.pool.close().await;

                let admin = admin_pool(&self.server).await?;
                sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\"", self.name))
                    .execute(&admin)
                    .await?;
                admin.close().await;
                Ok(())
            }
        }

        async fn admin_pool(server: &PgConnectOptions) -> Result<PgPool, sqlx::Error> {
            PgPoolOptions::new()
                .max_connections(1)
                .connect_with(server.clone().database("postgres"))
                .await
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth_state: Option<AuthState>,
        items: Option<SharedItemRepository>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                auth_state: None,
                items: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Mount every application route under `/api/v1`.
        pub fn mount_all_api_routes(self) -> Self {
            self.mount_api_routes(crate::api_routes())
        }

        pub fn manage_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        pub fn manage_item_repository(mut self, items: SharedItemRepository) -> Self {
            self.items = Some(items);
            self
        }

        /// In-process user and item stores behind the test signing secret.
        pub fn with_memory_stores(self) -> Self {
            self.manage_auth_state(memory_auth_state(TEST_JWT_SECRET))
                .manage_item_repository(Arc::new(MemoryItemRepository::new()))
        }

        /// Postgres-backed user and item stores on an already migrated pool.
        pub fn with_postgres_stores(self, pool: PgPool) -> Self {
            self.manage_auth_state(postgres_auth_state(TEST_JWT_SECRET, pool.clone()))
                .manage_item_repository(Arc::new(PgItemRepository::new(pool)))
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment)
                .attach(RequestLogger)
                .register("/", catchers());

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state);
            }

            if let Some(items) = self.items {
                rocket = rocket.manage(items);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
