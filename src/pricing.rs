//! Order totals and payment method resolution.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::{
        customers::Model as CustomerModel,
        products::{Column as ProdCol, Entity as Products},
        sea_orm_active_enums::ProductType,
    },
    error::{AppError, AppResult},
    payment::PaymentMethod,
};

/// A requested line with the product price captured at quote time.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub price: i64,
    pub product_type: ProductType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuote {
    pub total_price: i64,
    pub lines: Vec<PricedLine>,
}

/// Price every requested product id, in request order.
///
/// The same product may appear more than once. Any unknown id fails the
/// whole quote.
pub async fn price_for<C>(conn: &C, product_ids: &[Uuid]) -> AppResult<OrderQuote>
where
    C: ConnectionTrait,
{
    if product_ids.is_empty() {
        return Err(AppError::Validation("an order needs at least one item".into()));
    }

    let mut unique: Vec<Uuid> = product_ids.to_vec();
    unique.sort();
    unique.dedup();

    let catalog: HashMap<Uuid, (i64, ProductType)> = Products::find()
        .filter(ProdCol::Id.is_in(unique))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, (p.price, p.product_type)))
        .collect();

    let mut lines = Vec::with_capacity(product_ids.len());
    for product_id in product_ids {
        let (price, product_type) = catalog
            .get(product_id)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
        lines.push(PricedLine {
            product_id: *product_id,
            price,
            product_type,
        });
    }

    let total_price = lines.iter().map(|l| l.price).sum();
    Ok(OrderQuote { total_price, lines })
}

/// Registered customers always pay with their stored default; walk-ins must
/// supply a method with the request.
pub fn resolve_payment_method(
    customer: Option<&CustomerModel>,
    requested: Option<&PaymentMethod>,
) -> AppResult<PaymentMethod> {
    if let Some(customer) = customer {
        return Ok(PaymentMethod {
            payment_type: customer.default_payment_type,
            reference: customer.default_payment_reference.clone(),
        });
    }

    match requested {
        Some(method) if !method.reference.trim().is_empty() => Ok(PaymentMethod {
            payment_type: method.payment_type,
            reference: method.reference.trim().to_owned(),
        }),
        Some(_) => Err(AppError::Validation("payment reference is required".into())),
        None => Err(AppError::Validation(
            "payment type and reference are required for anonymous orders".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::entity::sea_orm_active_enums::PaymentType;

    fn customer() -> CustomerModel {
        CustomerModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            points: 0,
            default_payment_type: PaymentType::Visa,
            default_payment_reference: "4111111111111111".into(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn registered_customer_uses_stored_default() {
        let requested = PaymentMethod {
            payment_type: PaymentType::Mbway,
            reference: "912345678".into(),
        };
        let method = resolve_payment_method(Some(&customer()), Some(&requested)).unwrap();
        assert_eq!(method.payment_type, PaymentType::Visa);
        assert_eq!(method.reference, "4111111111111111");
    }

    #[test]
    fn anonymous_order_needs_a_payment_method() {
        let err = resolve_payment_method(None, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let blank = PaymentMethod {
            payment_type: PaymentType::Paypal,
            reference: "   ".into(),
        };
        let err = resolve_payment_method(None, Some(&blank)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn anonymous_order_uses_requested_method() {
        let requested = PaymentMethod {
            payment_type: PaymentType::Paypal,
            reference: " walkin@example.com ".into(),
        };
        let method = resolve_payment_method(None, Some(&requested)).unwrap();
        assert_eq!(method.payment_type, PaymentType::Paypal);
        assert_eq!(method.reference, "walkin@example.com");
    }
}
