use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::error;

use super::store_error;
use crate::models::{
    CreateListRequest, CreateListResponse, ErrorResponse, Item, ItemRequest, MessageResponse,
    ShoppingList,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Get all lists
#[utoipa::path(
    get,
    path = "/api/v1/lists",
    tag = "lists",
    responses(
        (status = 200, description = "All lists", body = [ShoppingList]),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
pub async fn get_lists(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ShoppingList>>, ApiError> {
    state.lists.list_all().await.map(Json).map_err(store_error)
}

/// Get one list
#[utoipa::path(
    get,
    path = "/api/v1/lists/{id}",
    tag = "lists",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 200, description = "The list", body = ShoppingList),
        (status = 404, description = "Unknown list", body = ErrorResponse)
    )
)]
pub async fn get_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShoppingList>, ApiError> {
    state.lists.get_list(&id).await.map(Json).map_err(store_error)
}

/// Create a list
#[utoipa::path(
    post,
    path = "/api/v1/lists",
    tag = "lists",
    request_body = CreateListRequest,
    responses(
        (status = 201, description = "List created", body = CreateListResponse),
        (status = 400, description = "Invalid name", body = ErrorResponse)
    )
)]
pub async fn create_list(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<CreateListResponse>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "List name must not be empty"));
    }
    let list = state.lists.create_list(name).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(CreateListResponse { id: list.id })))
}

/// Delete a list
#[utoipa::path(
    delete,
    path = "/api/v1/lists/{id}",
    tag = "lists",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 200, description = "List deleted", body = MessageResponse),
        (status = 404, description = "Unknown list", body = ErrorResponse)
    )
)]
pub async fn delete_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.lists.delete_list(&id).await.map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: "List deleted".to_string(),
    }))
}

/// Append an item to a list
#[utoipa::path(
    post,
    path = "/api/v1/lists/{id}/items",
    tag = "items",
    params(("id" = String, Path, description = "List id")),
    request_body = ItemRequest,
    responses(
        (status = 201, description = "Item added", body = Item),
        (status = 400, description = "Invalid item", body = ErrorResponse),
        (status = 404, description = "Unknown list", body = ErrorResponse)
    )
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<String>,
    Json(payload): Json<ItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    validate_item(&payload)?;
    let item = state.lists.add_item(&list_id, payload).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace the item at a position, keeping its id
#[utoipa::path(
    put,
    path = "/api/v1/lists/{id}/items/{index}",
    tag = "items",
    params(
        ("id" = String, Path, description = "List id"),
        ("index" = usize, Path, description = "Zero-based item position")
    ),
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 400, description = "Invalid item or index", body = ErrorResponse),
        (status = 404, description = "Unknown list", body = ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((list_id, index)): Path<(String, usize)>,
    Json(payload): Json<ItemRequest>,
) -> Result<Json<Item>, ApiError> {
    validate_item(&payload)?;
    state
        .lists
        .update_item(&list_id, index, &payload)
        .await
        .map(Json)
        .map_err(store_error)
}

/// Remove the item at a position
#[utoipa::path(
    delete,
    path = "/api/v1/lists/{id}/items/{index}",
    tag = "items",
    params(
        ("id" = String, Path, description = "List id"),
        ("index" = usize, Path, description = "Zero-based item position")
    ),
    responses(
        (status = 200, description = "Item removed", body = MessageResponse),
        (status = 400, description = "Index out of bounds", body = ErrorResponse),
        (status = 404, description = "Unknown list", body = ErrorResponse)
    )
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((list_id, index)): Path<(String, usize)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.lists.remove_item(&list_id, index).await.map_err(store_error)?;
    Ok(Json(MessageResponse {
        message: format!("Item {} removed", removed.id),
    }))
}

fn validate_item(payload: &ItemRequest) -> Result<(), ApiError> {
    if payload.item.trim().is_empty() {
        error!("Rejected item without text");
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Item text must not be empty"));
    }
    Ok(())
}
