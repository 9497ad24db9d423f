use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::middlewares::auth::JwtClaims;

fn json_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "message": message,
            "status": status.as_u16()
        })),
    )
        .into_response()
}

/// Custom JSON extractor that returns JSON error responses instead of HTML
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                Err(json_error(StatusCode::BAD_REQUEST, message))
            }
        }
    }
}

/// Identity of the caller, taken from the claims the auth middleware attached.
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<JwtClaims>()
            .map(|claims| CurrentUser(claims.sub.clone()))
            .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "Unauthenticated".to_string()))
    }
}
