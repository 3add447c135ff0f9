use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::{OrderItemStatus, OrderStatus},
    error::{AppError, AppResult},
};

/// Resulting order state after an accepted delivery-staff transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTransition {
    pub status: OrderStatus,
    pub delivered_by: Option<Uuid>,
}

/// Delivery staff move orders PREPARING -> READY -> DELIVERED. A courier
/// claims a READY order by setting it READY again; the claim blocks
/// cancellation and hides the order from other couriers. Sending the order
/// back to PREPARING drops the claim.
pub fn delivery_transition(
    current: OrderStatus,
    target: OrderStatus,
    assigned: Option<Uuid>,
    courier: Uuid,
    item_statuses: &[OrderItemStatus],
) -> AppResult<OrderTransition> {
    match (current, target) {
        (OrderStatus::Delivered | OrderStatus::Canceled, _) => Err(terminal(current)),
        (_, OrderStatus::Canceled) => Err(AppError::Forbidden),
        (OrderStatus::Preparing, OrderStatus::Preparing) => Err(AppError::PreconditionFailed(
            format!("order is already {current}"),
        )),
        (OrderStatus::Preparing, OrderStatus::Ready) => {
            if item_statuses.iter().any(|s| *s != OrderItemStatus::Ready) {
                return Err(AppError::PreconditionFailed("items not ready".into()));
            }
            Ok(OrderTransition {
                status: OrderStatus::Ready,
                delivered_by: None,
            })
        }
        (OrderStatus::Preparing, OrderStatus::Delivered) => Err(AppError::PreconditionFailed(
            "order must be READY before it is delivered".into(),
        )),
        (OrderStatus::Ready, OrderStatus::Ready) => match assigned {
            None => Ok(OrderTransition {
                status: OrderStatus::Ready,
                delivered_by: Some(courier),
            }),
            Some(holder) if holder == courier => Err(AppError::PreconditionFailed(
                "order is already claimed by this courier".into(),
            )),
            Some(_) => Err(claimed_elsewhere()),
        },
        (OrderStatus::Ready, OrderStatus::Preparing) => {
            ensure_holder(assigned, courier)?;
            Ok(OrderTransition {
                status: OrderStatus::Preparing,
                delivered_by: None,
            })
        }
        (OrderStatus::Ready, OrderStatus::Delivered) => {
            ensure_holder(assigned, courier)?;
            Ok(OrderTransition {
                status: OrderStatus::Delivered,
                delivered_by: Some(courier),
            })
        }
    }
}

fn ensure_holder(assigned: Option<Uuid>, courier: Uuid) -> AppResult<()> {
    match assigned {
        Some(holder) if holder != courier => Err(claimed_elsewhere()),
        _ => Ok(()),
    }
}

fn claimed_elsewhere() -> AppError {
    AppError::PreconditionFailed("order is claimed by another courier".into())
}

/// Managers may cancel anything not yet delivered and not already handed to
/// a courier.
pub fn ensure_cancellable(current: OrderStatus, delivered_by: Option<Uuid>) -> AppResult<()> {
    if current.is_terminal() {
        return Err(terminal(current));
    }
    if delivered_by.is_some() {
        return Err(AppError::PreconditionFailed(
            "order has already been assigned for delivery".into(),
        ));
    }
    Ok(())
}

fn terminal(status: OrderStatus) -> AppError {
    AppError::PreconditionFailed(format!("order is {status} and can no longer change"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const READY: OrderItemStatus = OrderItemStatus::Ready;
    const WAITING: OrderItemStatus = OrderItemStatus::Waiting;

    #[test]
    fn ready_requires_every_item_ready() {
        let courier = Uuid::new_v4();
        let err = delivery_transition(
            OrderStatus::Preparing,
            OrderStatus::Ready,
            None,
            courier,
            &[READY, WAITING],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(msg) if msg == "items not ready"));

        let next = delivery_transition(
            OrderStatus::Preparing,
            OrderStatus::Ready,
            None,
            courier,
            &[READY, READY],
        )
        .unwrap();
        assert_eq!(next.status, OrderStatus::Ready);
        assert_eq!(next.delivered_by, None);
    }

    #[test]
    fn courier_claims_a_ready_order_once() {
        let courier = Uuid::new_v4();
        let claimed =
            delivery_transition(OrderStatus::Ready, OrderStatus::Ready, None, courier, &[READY])
                .unwrap();
        assert_eq!(claimed.status, OrderStatus::Ready);
        assert_eq!(claimed.delivered_by, Some(courier));

        let again = delivery_transition(
            OrderStatus::Ready,
            OrderStatus::Ready,
            Some(courier),
            courier,
            &[READY],
        )
        .unwrap_err();
        assert!(matches!(again, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn other_couriers_cannot_touch_a_claimed_order() {
        let holder = Uuid::new_v4();
        let other = Uuid::new_v4();
        for target in [OrderStatus::Ready, OrderStatus::Preparing, OrderStatus::Delivered] {
            let err =
                delivery_transition(OrderStatus::Ready, target, Some(holder), other, &[READY])
                    .unwrap_err();
            assert!(matches!(err, AppError::PreconditionFailed(_)), "{target}");
        }
    }

    #[test]
    fn delivery_keeps_courier_and_regression_clears_it() {
        let courier = Uuid::new_v4();
        let delivered = delivery_transition(
            OrderStatus::Ready,
            OrderStatus::Delivered,
            Some(courier),
            courier,
            &[READY],
        )
        .unwrap();
        assert_eq!(delivered.delivered_by, Some(courier));

        let back = delivery_transition(
            OrderStatus::Ready,
            OrderStatus::Preparing,
            Some(courier),
            courier,
            &[READY],
        )
        .unwrap();
        assert_eq!(back.status, OrderStatus::Preparing);
        assert_eq!(back.delivered_by, None);
    }

    #[test]
    fn delivery_cannot_skip_ready() {
        let err = delivery_transition(
            OrderStatus::Preparing,
            OrderStatus::Delivered,
            None,
            Uuid::new_v4(),
            &[READY],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn terminal_states_reject_every_target() {
        let courier = Uuid::new_v4();
        for current in [OrderStatus::Delivered, OrderStatus::Canceled] {
            for target in [
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Delivered,
                OrderStatus::Canceled,
            ] {
                let err =
                    delivery_transition(current, target, None, courier, &[READY]).unwrap_err();
                assert!(matches!(err, AppError::PreconditionFailed(_)));
            }
            assert!(ensure_cancellable(current, None).is_err());
        }
    }

    #[test]
    fn couriers_cannot_cancel() {
        let err = delivery_transition(
            OrderStatus::Preparing,
            OrderStatus::Canceled,
            None,
            Uuid::new_v4(),
            &[READY],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn cancellation_rules() {
        assert!(ensure_cancellable(OrderStatus::Preparing, None).is_ok());
        assert!(ensure_cancellable(OrderStatus::Ready, None).is_ok());
        assert!(ensure_cancellable(OrderStatus::Ready, Some(Uuid::new_v4())).is_err());
    }
}
