use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    order_items::Model as OrderItemModel,
    orders::Model as OrderModel,
    sea_orm_active_enums::{OrderItemStatus, OrderStatus, PaymentType},
};

/// Monetary fields are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub ticket_number: i64,
    pub status: OrderStatus,
    pub customer_id: Option<Uuid>,
    pub total_price: i64,
    pub total_paid: i64,
    pub total_paid_with_points: i64,
    pub points_used_to_pay: i64,
    pub points_gained: i64,
    pub payment_type: PaymentType,
    pub payment_reference: String,
    pub delivered_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_local_number: i32,
    pub product_id: Uuid,
    pub price: i64,
    pub status: OrderItemStatus,
    pub preparation_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Order {
            id: model.id,
            ticket_number: model.ticket_number,
            status: model.status,
            customer_id: model.customer_id,
            total_price: model.total_price,
            total_paid: model.total_paid,
            total_paid_with_points: model.total_paid_with_points,
            points_used_to_pay: model.points_used_to_pay,
            points_gained: model.points_gained,
            payment_type: model.payment_type,
            payment_reference: model.payment_reference,
            delivered_by: model.delivered_by,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            order_local_number: model.order_local_number,
            product_id: model.product_id,
            price: model.price,
            status: model.status,
            preparation_by: model.preparation_by,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
