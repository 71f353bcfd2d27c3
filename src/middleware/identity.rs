//! Holder identity extraction
//!
//! Reads the authenticated holder from the `X-Holder-Id` header. Token
//! verification happens in front of this service; the value is trusted.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::api::response::ApiResponse;

/// Header carrying the holder ID
pub const HOLDER_HEADER: &str = "x-holder-id";

/// Identity of the caller acting as lease holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderIdentity(pub String);

/// Rejection for requests without a usable holder header
#[derive(Debug)]
pub struct IdentityRejection {
    message: &'static str,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.message, "MISSING_HOLDER");
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for HolderIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(HOLDER_HEADER)
            .ok_or(IdentityRejection {
                message: "X-Holder-Id header required",
            })?
            .to_str()
            .map_err(|_| IdentityRejection {
                message: "X-Holder-Id header is not valid text",
            })?
            .trim();

        if value.is_empty() {
            return Err(IdentityRejection {
                message: "X-Holder-Id header must not be empty",
            });
        }
        Ok(HolderIdentity(value.to_string()))
    }
}
