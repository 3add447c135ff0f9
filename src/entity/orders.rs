use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::{OrderStatus, PaymentType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::DeliveredBy",
        to = "super::users::Column::Id"
    )]
    DeliveredBy,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
