use std::sync::Arc;

use crate::{db::OrmConn, payment::PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(orm: OrmConn, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { orm, payments }
    }
}
