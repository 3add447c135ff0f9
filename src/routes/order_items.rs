use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderItemList, UpdateOrderItemStatusRequest},
    error::AppResult,
    middleware::auth::Actor,
    models::OrderItem,
    response::ApiResponse,
    routes::params::Pagination,
    services::order_item_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_prepared_items))
        .route("/{id}/status", patch(update_item_status))
}

#[utoipa::path(
    get,
    path = "/api/order-items",
    params(Pagination),
    responses(
        (status = 200, description = "Items prepared by the calling chef", body = ApiResponse<OrderItemList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Kitchen"
)]
pub async fn list_prepared_items(
    State(state): State<AppState>,
    actor: Actor,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderItemList>>> {
    let resp = order_item_service::list_prepared_items(&state, &actor, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/order-items/{id}/status",
    params(("id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateOrderItemStatusRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<OrderItem>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is no longer being prepared"),
    ),
    security(("bearer_auth" = [])),
    tag = "Kitchen"
)]
pub async fn update_item_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItemStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_item_service::update_item_status(&state, &actor, id, payload).await?;
    Ok(Json(resp))
}
