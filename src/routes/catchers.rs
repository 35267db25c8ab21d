//! JSON error catchers replacing Rocket's HTML defaults.

use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{Catcher, Request, Responder, catch, catchers};

use crate::auth::guards::GateOutcome;
use crate::auth::routes::AuthErrorResponse;
use crate::error::ErrorResponse;

/// 401 body plus the bearer challenge header.
#[derive(Responder)]
#[response(status = 401)]
pub struct BearerChallenge {
    body: Json<AuthErrorResponse>,
    challenge: Header<'static>,
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        not_found,
        unprocessable_entity,
        internal_error
    ]
}

#[catch(401)]
pub fn unauthorized(request: &Request<'_>) -> BearerChallenge {
    let message = match GateOutcome::of(request) {
        GateOutcome::Rejected { message, .. } => message.clone(),
        _ => "Not authenticated".to_string(),
    };

    BearerChallenge {
        body: Json(AuthErrorResponse {
            status: 401,
            message,
        }),
        challenge: Header::new("WWW-Authenticate", "Bearer"),
    }
}

#[catch(400)]
pub fn bad_request(_: &Request<'_>) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("BadRequest", "Malformed request"))
}

#[catch(404)]
pub fn not_found(request: &Request<'_>) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "NotFound",
        format!("No route for {} {}", request.method(), request.uri()),
    ))
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request<'_>) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "UnprocessableEntity",
        "Request body did not match the expected shape",
    ))
}

#[catch(500)]
pub fn internal_error(_: &Request<'_>) -> Json<ErrorResponse> {
    Json(ErrorResponse::new("InternalError", "Internal server error"))
}
