use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::responses::{LoginRequest, LoginResponse, RegisterRequest, UserSummary};
use crate::auth::{AuthError, AuthState};

type AuthErrorResult = status::Custom<Json<AuthErrorResponse>>;
type AuthRouteResult<T> = Result<Json<T>, AuthErrorResult>;

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

/// Create an account. Usernames are unique; a taken name yields 409.
#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> Result<status::Custom<Json<UserSummary>>, AuthErrorResult> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Username and password are required",
        ));
    }

    let user = state
        .register(username, &payload.password)
        .await
        .map_err(respond_error)?;

    log::info!("registered user '{}' (id {})", user.username, user.id);

    Ok(status::Custom(
        Status::Created,
        Json(UserSummary::from(&user)),
    ))
}

/// Exchange a username and password for a bearer token.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Username and password are required",
        ));
    }

    match state.login(username, &payload.password).await {
        Ok(token) => {
            log::info!("user '{}' logged in", username);
            Ok(Json(LoginResponse::bearer(token.token)))
        }
        Err(AuthError::InvalidCredentials) => {
            log::debug!("failed login attempt for '{}'", username);
            Err(respond_error(AuthError::InvalidCredentials))
        }
        Err(err) => Err(respond_error(err)),
    }
}

pub(crate) fn respond_error(err: AuthError) -> AuthErrorResult {
    if err.is_internal() {
        log::error!("auth request failed: {}", err);
    }
    respond_message(err.status(), err.public_message())
}

pub(crate) fn respond_message(status: Status, message: impl Into<String>) -> AuthErrorResult {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: message.into(),
        }),
    )
}
