use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        customers::{Entity as Customers, Model as CustomerModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    lifecycle,
    loyalty,
    middleware::auth::{Actor, Capability},
    payment::{GatewayResponse, PaymentMethod},
    pricing::{self, OrderQuote},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
    ticket,
};

/// Everything the persistence step needs, computed before money moves.
struct OrderDraft {
    customer_id: Option<Uuid>,
    points_used: i64,
    discount: i64,
    quote: OrderQuote,
    method: PaymentMethod,
}

/// Create an order: price, authorize payment, then persist in one transaction.
///
/// The gateway call happens before the transaction opens so no locks or
/// connections are held across the network round trip. If persistence fails
/// after a successful authorization the authorized amount is refunded once.
pub async fn create_order(
    state: &AppState,
    actor: &Actor,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    actor.require(Capability::PlaceOrder)?;

    let customer = match actor.customer_id() {
        Some(customer_id) => Some(find_customer(&state.orm, customer_id).await?),
        None => None,
    };

    let points_used = payload.points_used_to_pay.unwrap_or(0);
    if customer.is_none() && points_used != 0 {
        return Err(AppError::Validation(
            "only registered customers can pay with points".into(),
        ));
    }
    if let Some(customer) = &customer {
        if points_used > customer.points {
            return Err(AppError::Validation(format!(
                "not enough points: {} available",
                customer.points
            )));
        }
    }
    let discount = loyalty::discount_for(points_used)?;

    let quote = pricing::price_for(&state.orm, &payload.items).await?;
    if discount > quote.total_price {
        return Err(AppError::Validation(
            "points discount exceeds the order total".into(),
        ));
    }
    let method = pricing::resolve_payment_method(customer.as_ref(), payload.payment.as_ref())?;
    let authorized_amount = quote.total_price;

    let authorization = state
        .payments
        .authorize(&method, authorized_amount)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, amount = authorized_amount, "payment authorization unreachable");
            AppError::PaymentUnavailable(err.to_string())
        })?;
    if !authorization.is_success() {
        tracing::warn!(
            status = authorization.status,
            amount = authorized_amount,
            payment_type = %method.payment_type.gateway_code(),
            "payment authorization declined"
        );
        return Err(AppError::PaymentDeclined {
            status: authorization.status,
            body: authorization.body,
        });
    }
    tracing::info!(amount = authorized_amount, "payment authorized");

    let draft = OrderDraft {
        customer_id: customer.as_ref().map(|c| c.id),
        points_used,
        discount,
        quote,
        method,
    };

    let (order, items) = match persist_order(&state.orm, &draft).await {
        Ok(saved) => saved,
        Err(cause) => {
            return Err(
                compensate_failed_creation(state, actor, &draft.method, authorized_amount, cause)
                    .await,
            );
        }
    };

    tracing::info!(
        order_id = %order.id,
        ticket_number = order.ticket_number,
        total_paid = order.total_paid,
        "order created"
    );
    audit::record(
        &state.orm,
        actor.user_id(),
        "order_created",
        "orders",
        json!({ "order_id": order.id, "ticket_number": order.ticket_number }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order created",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
    ))
}

async fn persist_order(
    orm: &OrmConn,
    draft: &OrderDraft,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let txn = orm.begin().await?;

    let ticket_number = ticket::next_ticket_number(&txn).await?;

    let total_price = draft.quote.total_price;
    let total_paid = total_price - draft.discount;
    let points_gained = match draft.customer_id {
        Some(_) => loyalty::points_earned(total_paid),
        None => 0,
    };

    if let Some(customer_id) = draft.customer_id {
        loyalty::apply_debit(&txn, customer_id, draft.points_used).await?;
        loyalty::apply_credit(&txn, customer_id, points_gained).await?;
    }

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        ticket_number: Set(ticket_number),
        status: Set(OrderStatus::Preparing),
        customer_id: Set(draft.customer_id),
        total_price: Set(total_price),
        total_paid: Set(total_paid),
        total_paid_with_points: Set(draft.discount),
        points_used_to_pay: Set(draft.points_used),
        points_gained: Set(points_gained),
        payment_type: Set(draft.method.payment_type),
        payment_reference: Set(draft.method.reference.clone()),
        delivered_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(draft.quote.lines.len());
    for (index, line) in draft.quote.lines.iter().enumerate() {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            order_local_number: Set(index as i32 + 1),
            product_id: Set(line.product_id),
            price: Set(line.price),
            status: Set(lifecycle::order_item::initial_status(line.product_type)),
            preparation_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;
    Ok((order, items))
}

/// Undo the authorization after a failed persistence step. Called exactly
/// once per failed creation attempt.
async fn compensate_failed_creation(
    state: &AppState,
    actor: &Actor,
    method: &PaymentMethod,
    amount: i64,
    cause: AppError,
) -> AppError {
    tracing::error!(error = ?cause, amount, "order persistence failed after authorization, refunding");

    let refund_problem = match state.payments.refund(method, amount).await {
        Ok(response) if response.is_success() => None,
        Ok(response) => Some(describe_gateway_failure(&response)),
        Err(err) => Some(err.to_string()),
    };

    match refund_problem {
        None => {
            audit::record(
                &state.orm,
                actor.user_id(),
                "order_creation_refunded",
                "orders",
                json!({ "amount": amount, "cause": cause.to_string() }),
            )
            .await;
            AppError::ConsistencyFault(cause.to_string())
        }
        Some(refund) => {
            tracing::error!(
                amount,
                payment_type = %method.payment_type.gateway_code(),
                payment_reference = %method.reference,
                cause = %cause,
                refund = %refund,
                "authorized charge left unrefunded, operator action required"
            );
            audit::record(
                &state.orm,
                actor.user_id(),
                "payment_compensation_failed",
                "orders",
                json!({
                    "amount": amount,
                    "payment_type": method.payment_type,
                    "payment_reference": method.reference,
                    "cause": cause.to_string(),
                    "refund": refund,
                }),
            )
            .await;
            AppError::CompensationFailure {
                cause: cause.to_string(),
                refund,
            }
        }
    }
}

/// Route a status change to the actor allowed to make it: managers cancel,
/// delivery staff move the order along.
pub async fn update_order_status(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    match payload.status {
        OrderStatus::Canceled => cancel_order(state, actor, id).await,
        target => {
            actor.require(Capability::AdvanceDelivery)?;
            let courier = actor.user_id().ok_or(AppError::Forbidden)?;
            advance_delivery(state, actor, courier, id, target).await
        }
    }
}

/// Cancel an order: refund first, then reverse loyalty credit and mark it
/// CANCELED. Nothing changes locally unless the refund succeeds.
pub async fn cancel_order(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    actor.require(Capability::CancelOrder)?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    lifecycle::order::ensure_cancellable(order.status, order.delivered_by)?;

    if let (Some(customer_id), true) = (order.customer_id, order.points_gained > 0) {
        let customer = find_customer(&state.orm, customer_id).await?;
        if loyalty::adjusted_balance(customer.points, -order.points_gained).is_err() {
            return Err(AppError::PreconditionFailed(
                "customer has already spent the points earned by this order".into(),
            ));
        }
    }

    let method = PaymentMethod {
        payment_type: order.payment_type,
        reference: order.payment_reference.clone(),
    };
    let refund = state
        .payments
        .refund(&method, order.total_paid)
        .await
        .map_err(|err| AppError::PaymentUnavailable(err.to_string()))?;
    if !refund.is_success() {
        tracing::warn!(order_id = %id, status = refund.status, "cancellation refund declined");
        return Err(AppError::PaymentDeclined {
            status: refund.status,
            body: refund.body,
        });
    }

    let (order, items) = match finalize_cancellation(&state.orm, id).await {
        Ok(saved) => saved,
        Err(cause) => {
            tracing::error!(
                order_id = %id,
                amount = order.total_paid,
                error = ?cause,
                "refund issued but order could not be canceled, operator action required"
            );
            audit::record(
                &state.orm,
                actor.user_id(),
                "order_cancel_inconsistent",
                "orders",
                json!({ "order_id": id, "refunded": order.total_paid, "cause": cause.to_string() }),
            )
            .await;
            return Err(AppError::ConsistencyFault(cause.to_string()));
        }
    };

    tracing::info!(order_id = %order.id, refunded = order.total_paid, "order canceled");
    audit::record(
        &state.orm,
        actor.user_id(),
        "order_canceled",
        "orders",
        json!({ "order_id": order.id, "refunded": order.total_paid }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order canceled",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
    ))
}

async fn finalize_cancellation(
    orm: &OrmConn,
    id: Uuid,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let txn = orm.begin().await?;

    // Re-check against the locked row, not the copy read before the refund.
    let order = lock_order(&txn, id).await?;
    lifecycle::order::ensure_cancellable(order.status, order.delivered_by)?;

    if let Some(customer_id) = order.customer_id {
        loyalty::reverse(&txn, customer_id, order.points_gained).await?;
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Canceled);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    let items = items_of(&txn, order.id).await?;

    txn.commit().await?;
    Ok((order, items))
}

async fn advance_delivery(
    state: &AppState,
    actor: &Actor,
    courier: Uuid,
    id: Uuid,
    target: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let items = items_of(&txn, id).await?;
    let statuses: Vec<_> = items.iter().map(|item| item.status).collect();
    let next = lifecycle::order::delivery_transition(
        order.status,
        target,
        order.delivered_by,
        courier,
        &statuses,
    )?;

    let previous = order.status;
    let previous_courier = order.delivered_by;
    let mut active: OrderActive = order.into();
    active.status = Set(next.status);
    active.delivered_by = Set(next.delivered_by);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    let action = if previous == order.status {
        "order_claimed"
    } else {
        "order_status_update"
    };
    tracing::info!(
        order_id = %order.id,
        from = %previous,
        to = %order.status,
        courier = ?order.delivered_by,
        "order status changed"
    );
    audit::record(
        &state.orm,
        actor.user_id(),
        action,
        "orders",
        json!({
            "order_id": order.id,
            "from": previous,
            "to": order.status,
            "previous_courier": previous_courier,
            "courier": order.delivered_by,
        }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order updated",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
    ))
}

pub async fn list_orders(
    state: &AppState,
    actor: &Actor,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = visible_orders(actor)?;
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::TicketNumber),
        SortOrder::Desc => finder.order_by_desc(OrderCol::TicketNumber),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(visible_orders(actor)?.add(OrderCol::Id.eq(id)))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let items = items_of(&state.orm, order.id).await?;

    Ok(ApiResponse::single(
        "OK",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
    ))
}

/// Administrative removal. Items and order go in the same transaction.
pub async fn delete_order(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    actor.require(Capability::DeleteOrder)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    let items = items_of(&txn, id).await?;

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        actor.user_id(),
        "order_deleted",
        "orders",
        json!({ "order_id": id, "ticket_number": order.ticket_number }),
    )
    .await;

    Ok(ApiResponse::single(
        "Order deleted",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
    ))
}

/// Which orders an actor may read.
fn visible_orders(actor: &Actor) -> AppResult<Condition> {
    if actor.can(Capability::ViewAllOrders) {
        return Ok(Condition::all());
    }
    if let (true, Some(courier)) = (actor.can(Capability::ViewAssignedOrders), actor.user_id()) {
        let awaiting_pickup = Condition::all()
            .add(OrderCol::Status.eq(OrderStatus::Ready))
            .add(OrderCol::DeliveredBy.is_null());
        return Ok(Condition::all().add(
            Condition::any()
                .add(OrderCol::DeliveredBy.eq(courier))
                .add(awaiting_pickup),
        ));
    }
    if let (true, Some(customer_id)) = (actor.can(Capability::ViewOwnOrders), actor.customer_id()) {
        return Ok(Condition::all().add(OrderCol::CustomerId.eq(customer_id)));
    }
    Err(AppError::Forbidden)
}

pub(crate) async fn lock_order<C>(conn: &C, id: Uuid) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

async fn items_of<C>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>>
where
    C: ConnectionTrait,
{
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::OrderLocalNumber)
        .all(conn)
        .await?)
}

async fn find_customer<C>(conn: &C, customer_id: Uuid) -> AppResult<CustomerModel>
where
    C: ConnectionTrait,
{
    Customers::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))
}

fn describe_gateway_failure(response: &GatewayResponse) -> String {
    format!("gateway status {}: {}", response.status, response.body)
}
