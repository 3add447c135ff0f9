//! Ticket numbering for orders.
//!
//! Numbers come from a single counter row that is advanced with a
//! compare-and-swap update while holding a row lock, never from
//! `MAX(ticket_number) + 1`. The call must run inside the transaction that
//! persists the order so that a rolled back creation also rolls back its
//! increment.

use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::{
    entity::ticket_sequences::{Column as SeqCol, Entity as TicketSequences},
    error::{AppError, AppResult},
};

pub const ORDERS_SEQUENCE: &str = "orders";

const MAX_CAS_ATTEMPTS: usize = 8;

/// Reserve the next ticket number.
pub async fn next_ticket_number<C>(conn: &C) -> AppResult<i64>
where
    C: ConnectionTrait,
{
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let current = TicketSequences::find_by_id(ORDERS_SEQUENCE.to_owned())
            .lock(LockType::Update)
            .one(conn)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("ticket sequence row is missing"))
            })?;

        let next = current.value + 1;
        let result = TicketSequences::update_many()
            .col_expr(SeqCol::Value, Expr::value(next))
            .filter(SeqCol::Name.eq(ORDERS_SEQUENCE))
            .filter(SeqCol::Value.eq(current.value))
            .exec(conn)
            .await?;

        if result.rows_affected == 1 {
            return Ok(next);
        }
        tracing::debug!(attempt, observed = current.value, "ticket sequence moved, retrying");
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "ticket sequence contention: gave up after {MAX_CAS_ATTEMPTS} attempts"
    )))
}
