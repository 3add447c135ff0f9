//! Boundary to the external payment processor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::entity::sea_orm_active_enums::PaymentType;

mod http;

pub use http::HttpPaymentGateway;

/// Status code the processor uses to signal an accepted payment or refund.
pub const GATEWAY_SUCCESS: u16 = 201;

/// Which account money is drawn from or returned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        self.status == GATEWAY_SUCCESS
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Money movement against the processor. Amounts are in cents.
///
/// Neither call is retried here; repeating a payment call can double charge.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(
        &self,
        method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError>;

    async fn refund(
        &self,
        method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError>;
}
