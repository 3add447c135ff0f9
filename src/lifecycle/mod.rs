//! Order and order item state machines.
//!
//! These functions only decide; callers load the current state from a row
//! locked inside the same transaction that writes the outcome.

pub mod order;
pub mod order_item;
