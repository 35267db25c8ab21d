use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{
    Object, SecurityRequirement, SecurityScheme, SecuritySchemeData,
};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};

use crate::auth::{AuthError, AuthResult, AuthState, JwtService};

const SECURITY_SCHEME_NAME: &str = "BearerAuth";

/// Username carried by a verified bearer token, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub username: String,
}

/// What the gate decided for the current request. Cached in request-local
/// state so the 401 catcher and the access log can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    NotEvaluated,
    Verified(String),
    Rejected { status: Status, message: String },
}

impl GateOutcome {
    fn from_result(result: &AuthResult<AuthenticatedIdentity>) -> Self {
        match result {
            Ok(identity) => GateOutcome::Verified(identity.username.clone()),
            Err(err) => GateOutcome::Rejected {
                status: err.status(),
                message: err.public_message(),
            },
        }
    }

    pub fn of<'a>(request: &'a Request<'_>) -> &'a GateOutcome {
        request.local_cache(|| GateOutcome::NotEvaluated)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedIdentity {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let result = extract_identity(request).await;
        request.local_cache(|| GateOutcome::from_result(&result));

        match result {
            Ok(identity) => Outcome::Success(identity),
            Err(err) => {
                if err.is_internal() {
                    log::error!("auth gate failure: {}", err);
                } else {
                    log::debug!("rejected {} {}: {}", request.method(), request.uri(), err);
                }
                Outcome::Error((err.status(), err))
            }
        }
    }
}

impl<'r> OpenApiFromRequest<'r> for AuthenticatedIdentity {
    fn from_request_input(
        _generator: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        let scheme = SecurityScheme {
            description: Some("Access token from `POST /api/v1/auth/login`.".to_owned()),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_owned(),
                bearer_format: Some("JWT".to_owned()),
            },
            extensions: Object::default(),
        };
        let mut requirement = SecurityRequirement::new();
        requirement.insert(SECURITY_SCHEME_NAME.to_owned(), Vec::new());
        Ok(RequestHeaderInput::Security(
            SECURITY_SCHEME_NAME.to_owned(),
            scheme,
            requirement,
        ))
    }
}

async fn extract_identity(request: &Request<'_>) -> AuthResult<AuthenticatedIdentity> {
    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    authorize(
        request.headers().get_one("Authorization"),
        &auth_state.jwt_service,
    )
}

/// NoToken -> TokenExtracted -> Verified | Rejected.
pub fn authorize(header: Option<&str>, tokens: &JwtService) -> AuthResult<AuthenticatedIdentity> {
    let token = bearer_token(header)?;
    let username = tokens.verify_access_token(token)?;
    Ok(AuthenticatedIdentity { username })
}

pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::MissingCredentials)
    }
}
