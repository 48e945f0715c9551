pub mod health;
pub mod lists;

pub use health::*;
pub use lists::*;

use axum::{http::StatusCode, Json};
use tracing::error;

use crate::db::StoreError;
use crate::models::ErrorResponse;

/// Map a storage failure onto the HTTP error it should surface as
pub(crate) fn store_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::IndexOutOfBounds { .. } => StatusCode::BAD_REQUEST,
        StoreError::Database(_) => {
            error!("Storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ErrorResponse::reply(status, e.to_string())
}
