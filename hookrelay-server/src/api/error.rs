use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hookrelay_core::entities::subscription::RegistryError;
use hookrelay_core::processors::DispatchError;
use serde::Serialize;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn registry_status(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::InvalidUrl(_)
        | RegistryError::InvalidPattern(_)
        | RegistryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        RegistryError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Registry(e) => registry_status(e),
            ApiError::Dispatch(DispatchError::Registry(e)) => registry_status(e),
            ApiError::Dispatch(DispatchError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(DispatchError::Unavailable) => {
                tracing::error!("API: delivery worker unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
