//! Loyalty points: redemption value, accrual, and balance adjustments.
//!
//! Policy: points are redeemed in blocks of 10, each block worth 1.00 off
//! the order. Every whole 1.00 actually paid earns one point.

use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};
use uuid::Uuid;

use crate::{
    entity::customers::{ActiveModel as CustomerActive, Entity as Customers, Model as CustomerModel},
    error::{AppError, AppResult},
};

pub const POINTS_PER_REDEMPTION: i64 = 10;
pub const CENTS_PER_REDEMPTION: i64 = 100;
pub const CENTS_PER_EARNED_POINT: i64 = 100;

/// Monetary discount, in cents, for redeeming `points_used`.
pub fn discount_for(points_used: i64) -> AppResult<i64> {
    if points_used < 0 {
        return Err(AppError::Validation(
            "points_used_to_pay must not be negative".into(),
        ));
    }
    if points_used % POINTS_PER_REDEMPTION != 0 {
        return Err(AppError::Validation(format!(
            "points_used_to_pay must be a multiple of {POINTS_PER_REDEMPTION}"
        )));
    }
    (points_used / POINTS_PER_REDEMPTION)
        .checked_mul(CENTS_PER_REDEMPTION)
        .ok_or_else(|| AppError::Validation("points_used_to_pay is out of range".into()))
}

/// Points credited for paying `amount_paid` cents. Rounds down.
pub fn points_earned(amount_paid: i64) -> i64 {
    amount_paid.max(0) / CENTS_PER_EARNED_POINT
}

/// Apply a signed adjustment to a balance, refusing to go below zero.
pub fn adjusted_balance(balance: i64, delta: i64) -> AppResult<i64> {
    let next = balance
        .checked_add(delta)
        .ok_or_else(|| AppError::InvariantViolation("points balance overflow".into()))?;
    if next < 0 {
        return Err(AppError::InvariantViolation(format!(
            "points balance would become negative ({balance} {delta:+})"
        )));
    }
    Ok(next)
}

pub async fn apply_debit<C>(conn: &C, customer_id: Uuid, points_used: i64) -> AppResult<CustomerModel>
where
    C: ConnectionTrait,
{
    apply_adjustment(conn, customer_id, -non_negative(points_used)?).await
}

pub async fn apply_credit<C>(conn: &C, customer_id: Uuid, points_earned: i64) -> AppResult<CustomerModel>
where
    C: ConnectionTrait,
{
    apply_adjustment(conn, customer_id, non_negative(points_earned)?).await
}

/// Take back points that an order credited earlier.
pub async fn reverse<C>(conn: &C, customer_id: Uuid, points: i64) -> AppResult<CustomerModel>
where
    C: ConnectionTrait,
{
    apply_adjustment(conn, customer_id, -non_negative(points)?).await
}

/// Lock the customer row, then write the adjusted balance.
pub async fn apply_adjustment<C>(conn: &C, customer_id: Uuid, delta: i64) -> AppResult<CustomerModel>
where
    C: ConnectionTrait,
{
    let customer = Customers::find_by_id(customer_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;

    if delta == 0 {
        return Ok(customer);
    }

    let points = adjusted_balance(customer.points, delta)?;
    let mut active: CustomerActive = customer.into();
    active.points = Set(points);
    Ok(active.update(conn).await?)
}

fn non_negative(points: i64) -> AppResult<i64> {
    if points < 0 {
        return Err(AppError::InvariantViolation(format!(
            "point adjustments are unsigned, got {points}"
        )));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_points_are_worth_five_units() {
        assert_eq!(discount_for(50).unwrap(), 500);
        assert_eq!(discount_for(0).unwrap(), 0);
    }

    #[test]
    fn discount_rejects_negative_and_partial_blocks() {
        assert!(matches!(discount_for(-10), Err(AppError::Validation(_))));
        assert!(matches!(discount_for(15), Err(AppError::Validation(_))));
    }

    #[test]
    fn oversized_redemption_is_rejected_not_wrapped() {
        assert!(matches!(
            discount_for(i64::MAX - 7),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn accrual_rounds_down_to_whole_units() {
        assert_eq!(points_earned(1500), 15);
        assert_eq!(points_earned(1299), 12);
        assert_eq!(points_earned(99), 0);
        assert_eq!(points_earned(-500), 0);
    }

    #[test]
    fn balance_never_goes_negative() {
        assert_eq!(adjusted_balance(100, -50).unwrap(), 50);
        assert_eq!(adjusted_balance(10, -10).unwrap(), 0);
        assert!(matches!(
            adjusted_balance(5, -10),
            Err(AppError::InvariantViolation(_))
        ));
    }

    #[test]
    fn any_sequence_of_adjustments_keeps_balance_non_negative() {
        let deltas = [30, -10, -25, 40, -100, -35, 5, -5, 0];
        let mut balance = 0;
        for delta in deltas {
            if let Ok(next) = adjusted_balance(balance, delta) {
                balance = next;
            }
            assert!(balance >= 0);
        }
        assert_eq!(balance, 25);
    }
}
