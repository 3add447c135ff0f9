use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Number, Value, json};

use super::{GatewayResponse, PaymentError, PaymentGateway, PaymentMethod};

/// JSON-over-HTTP client for the payment processor.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    async fn post(
        &self,
        path: &str,
        method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError> {
        let payload = json!({
            "type": method.payment_type.gateway_code(),
            "reference": method.reference,
            "value": decimal_amount(amount),
        });

        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(path, status, "payment gateway responded");
        Ok(GatewayResponse { status, body })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(
        &self,
        method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError> {
        self.post("payments", method, amount).await
    }

    async fn refund(
        &self,
        method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError> {
        self.post("refunds", method, amount).await
    }
}

/// The processor takes amounts in currency units with two decimals.
fn decimal_amount(cents: i64) -> Value {
    Number::from_f64(cents as f64 / 100.0)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_sent_in_currency_units() {
        assert_eq!(decimal_amount(1250), json!(12.5));
        assert_eq!(decimal_amount(500), json!(5.0));
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let gateway =
            HttpPaymentGateway::new("http://payments.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.base_url, "http://payments.local/api");
    }
}
