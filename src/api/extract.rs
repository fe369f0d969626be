//! A `Json` extractor that routes its own rejections through [`ApiError`].
//!
//! Plain `axum::Json<T>` fails inside the extractor, before the handler body
//! runs, so a malformed or missing-field body never reaches the handler's own
//! `Result<_, ApiError>` error path and axum's default rejection response
//! (422, plain text) slips out instead of the `{"error": ...}` envelope every
//! other failure mode produces. `ValidatedJson` wraps the same extraction and
//! maps the rejection through `ApiError` up front so the envelope is uniform.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use super::error::ApiError;

/// Drop-in replacement for `axum::Json<T>` as a handler parameter.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ValidatedJson(value))
    }
}
