use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderItemList, UpdateOrderItemStatusRequest},
    entity::order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
    error::{AppError, AppResult},
    lifecycle,
    middleware::auth::{Actor, Capability},
    models::OrderItem,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::order_service::lock_order,
    state::AppState,
};

/// Chef moves one item through preparation.
///
/// The parent order row is locked first so item changes serialize with
/// order status changes; both statuses are then read fresh under that lock.
pub async fn update_item_status(
    state: &AppState,
    actor: &Actor,
    item_id: Uuid,
    payload: UpdateOrderItemStatusRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    actor.require(Capability::PrepareItems)?;
    let chef = actor.user_id().ok_or(AppError::Forbidden)?;

    let txn = state.orm.begin().await?;

    let order_id = OrderItems::find_by_id(item_id)
        .one(&txn)
        .await?
        .map(|item| item.order_id)
        .ok_or_else(|| AppError::NotFound(format!("order item {item_id}")))?;
    let order = lock_order(&txn, order_id).await?;
    let item = OrderItems::find_by_id(item_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order item {item_id}")))?;

    let next =
        lifecycle::order_item::chef_transition(order.status, item.status, payload.status, chef)?;

    let previous = item.status;
    let mut active: OrderItemActive = item.into();
    active.status = Set(next.status);
    active.preparation_by = Set(next.preparation_by);
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&txn).await?;

    txn.commit().await?;

    tracing::debug!(item_id = %item.id, from = %previous, to = %item.status, "order item status changed");
    audit::record(
        &state.orm,
        Some(chef),
        "order_item_status_update",
        "order_items",
        json!({ "order_id": item.order_id, "item_id": item.id, "from": previous, "to": item.status }),
    )
    .await;

    Ok(ApiResponse::single("Item updated", item.into()))
}

/// Items the calling chef has marked ready, most recent first.
pub async fn list_prepared_items(
    state: &AppState,
    actor: &Actor,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderItemList>> {
    actor.require(Capability::PrepareItems)?;
    let chef = actor.user_id().ok_or(AppError::Forbidden)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = OrderItems::find()
        .filter(OrderItemCol::PreparationBy.eq(chef))
        .order_by_desc(OrderItemCol::UpdatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderItemList { items }, Some(meta)))
}
