use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::{OrderItemStatus, OrderStatus},
    models::{Order, OrderItem},
    payment::PaymentMethod,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Product ids, one entry per line; repeat an id to order it twice.
    pub items: Vec<Uuid>,
    #[serde(default)]
    pub points_used_to_pay: Option<i64>,
    /// Required when ordering without a customer account.
    #[serde(default)]
    pub payment: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderItemStatusRequest {
    pub status: OrderItemStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemList {
    pub items: Vec<OrderItem>,
}
