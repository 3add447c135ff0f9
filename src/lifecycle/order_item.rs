use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::{OrderItemStatus, OrderStatus, ProductType},
    error::{AppError, AppResult},
};

/// Hot dishes go to the kitchen queue; everything else is served as is.
pub fn initial_status(product_type: ProductType) -> OrderItemStatus {
    if product_type.requires_preparation() {
        OrderItemStatus::Waiting
    } else {
        OrderItemStatus::Ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTransition {
    pub status: OrderItemStatus,
    pub preparation_by: Option<Uuid>,
}

/// A chef moves an item between WAITING, PREPARING and READY while its order
/// is still PREPARING. READY records the chef; anything else clears it.
pub fn chef_transition(
    order_status: OrderStatus,
    current: OrderItemStatus,
    target: OrderItemStatus,
    chef: Uuid,
) -> AppResult<ItemTransition> {
    if order_status != OrderStatus::Preparing {
        return Err(AppError::PreconditionFailed(format!(
            "order item cannot be changed while the order is {order_status}"
        )));
    }
    if current == target {
        return Err(AppError::PreconditionFailed(format!(
            "order item is already {current}"
        )));
    }

    let preparation_by = match target {
        OrderItemStatus::Ready => Some(chef),
        OrderItemStatus::Waiting | OrderItemStatus::Preparing => None,
    };
    Ok(ItemTransition {
        status: target,
        preparation_by,
    })
}
