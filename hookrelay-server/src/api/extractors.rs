//! Request identity extractors.
//!
//! - `Owner`: the platform user on whose behalf a webhook route is
//!   called, taken from `Hookrelay-Owner-Id`. Authenticating that user is
//!   the upstream gateway's job.
//! - `AdminAuth`: checks `Hookrelay-Admin-Authorization` against the
//!   argon2 hash of the admin secret.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use hookrelay_core::entities::OwnerId;
use hookrelay_sdk::signature::{ADMIN_AUTH_HEADER, OWNER_ID_HEADER};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

pub struct Owner(pub OwnerId);

#[derive(Debug)]
pub enum OwnerRejection {
    Missing,
    Invalid,
}

impl IntoResponse for OwnerRejection {
    fn into_response(self) -> Response {
        let message = match self {
            OwnerRejection::Missing => "missing Hookrelay-Owner-Id header",
            OwnerRejection::Invalid => "invalid Hookrelay-Owner-Id header",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for Owner {
    type Rejection = OwnerRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_ID_HEADER)
            .ok_or(OwnerRejection::Missing)?
            .to_str()
            .map_err(|_| OwnerRejection::Invalid)?
            .trim();
        if value.is_empty() {
            return Err(OwnerRejection::Invalid);
        }
        Ok(Owner(OwnerId::from(value)))
    }
}

// ---------------------------------------------------------------------------
// AdminAuth
// ---------------------------------------------------------------------------

pub struct AdminAuth;

#[derive(Debug)]
pub enum AdminAuthRejection {
    Missing,
    Invalid,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AdminAuthRejection::Missing => "missing Hookrelay-Admin-Authorization header",
            AdminAuthRejection::Invalid => "invalid admin credentials",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthRejection::Missing)?
            .to_str()
            .map_err(|_| AdminAuthRejection::Invalid)?;

        let admin = state.admin.read().await;
        let valid = admin.verify_secret(provided);
        drop(admin);

        if valid {
            Ok(AdminAuth)
        } else {
            Err(AdminAuthRejection::Invalid)
        }
    }
}
