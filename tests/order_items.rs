mod common;

use restaurant_pos_api::{
    dto::orders::{CreateOrderRequest, UpdateOrderItemStatusRequest},
    entity::sea_orm_active_enums::{OrderItemStatus, ProductType, UserType},
    error::AppError,
    middleware::auth::Actor,
    models::OrderItem,
    routes::params::Pagination,
    services::{order_item_service, order_service},
};
use uuid::Uuid;

async fn move_item(
    app: &common::TestApp,
    actor: &Actor,
    item_id: Uuid,
    status: OrderItemStatus,
) -> Result<OrderItem, AppError> {
    order_item_service::update_item_status(
        &app.state,
        actor,
        item_id,
        UpdateOrderItemStatusRequest { status },
    )
    .await
    .map(|resp| resp.data.expect("item data"))
}

async fn hot_dish_order(app: &common::TestApp) -> anyhow::Result<Uuid> {
    let stew = common::product(app, "Stew", ProductType::HotDish, 900).await?;
    let resp = order_service::create_order(
        &app.state,
        &Actor::Anonymous,
        CreateOrderRequest {
            items: vec![stew],
            points_used_to_pay: None,
            payment: Some(common::walk_in_payment()),
        },
    )
    .await?;
    let created = resp.data.expect("order data");
    assert_eq!(created.items[0].status, OrderItemStatus::Waiting);
    Ok(created.items[0].id)
}

#[tokio::test]
async fn chef_prepares_an_item_and_is_credited() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let chef = common::staff(&app, UserType::Chef).await?;
    let item_id = hot_dish_order(&app).await?;

    let preparing = move_item(&app, &chef, item_id, OrderItemStatus::Preparing).await?;
    assert_eq!(preparing.status, OrderItemStatus::Preparing);
    assert_eq!(preparing.preparation_by, None);

    let ready = move_item(&app, &chef, item_id, OrderItemStatus::Ready).await?;
    assert_eq!(ready.status, OrderItemStatus::Ready);
    assert_eq!(ready.preparation_by, chef.user_id());

    let listed = order_item_service::list_prepared_items(
        &app.state,
        &chef,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let items = listed.data.expect("items").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, item_id);
    Ok(())
}

#[tokio::test]
async fn sending_an_item_back_clears_the_chef() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let chef = common::staff(&app, UserType::Chef).await?;
    let item_id = hot_dish_order(&app).await?;

    move_item(&app, &chef, item_id, OrderItemStatus::Ready).await?;
    let back = move_item(&app, &chef, item_id, OrderItemStatus::Waiting).await?;
    assert_eq!(back.status, OrderItemStatus::Waiting);
    assert_eq!(back.preparation_by, None);

    let err = move_item(&app, &chef, item_id, OrderItemStatus::Waiting).await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));
    Ok(())
}

#[tokio::test]
async fn only_chefs_touch_items() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let courier = common::staff(&app, UserType::Delivery).await?;
    let manager = common::staff(&app, UserType::Manager).await?;
    let chef = common::staff(&app, UserType::Chef).await?;
    let item_id = hot_dish_order(&app).await?;

    for actor in [courier, manager, Actor::Anonymous] {
        let err = move_item(&app, &actor, item_id, OrderItemStatus::Ready).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden), "{actor:?}");
    }

    let err = move_item(&app, &chef, Uuid::new_v4(), OrderItemStatus::Ready).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
