use utoipa::OpenApi;

use crate::handlers::{health, lists};
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ready_check,
        lists::get_lists,
        lists::get_list,
        lists::create_list,
        lists::delete_list,
        lists::add_item,
        lists::update_item,
        lists::remove_item,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            ErrorResponse,
            ShoppingList,
            Item,
            CreateListRequest,
            CreateListResponse,
            ItemRequest,
            MessageResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "lists", description = "Shopping lists"),
        (name = "items", description = "Items inside a list")
    )
)]
pub struct ApiDoc;
