//! HTTP adapter for the external payment processor.
//!
//! Both the card-intent API and the mobile-money STK push are opaque remote
//! calls; their retry and webhook semantics belong to the processor. Calls
//! here run on the blocking thread pool (`web::block`), never on the
//! async executor.

use std::env;
use std::time::Duration;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;

use crate::domain::errors::DomainError;
use crate::domain::ports::{PaymentGateway, PaymentIntent};

const DEFAULT_GATEWAY_URL: &str = "http://localhost:9090";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpPaymentGateway {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String) -> Result<Self, DomainError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Internal(format!("payment client: {}", e)))?;
        Ok(HttpPaymentGateway { base_url, client })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        let base_url =
            env::var("PAYMENT_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        Self::new(base_url)
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    intent_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    checkout_request_id: String,
}

impl PaymentGateway for HttpPaymentGateway {
    fn create_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        order_number: &str,
    ) -> Result<PaymentIntent, DomainError> {
        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .json(&json!({
                "amount": amount.to_string(),
                "currency": currency,
                "metadata": { "order_number": order_number }
            }))
            .send()
            .map_err(|e| DomainError::Internal(format!("payment gateway: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::Internal(format!(
                "payment gateway returned {}",
                resp.status()
            )));
        }

        let body: IntentResponse = resp
            .json()
            .map_err(|e| DomainError::Internal(format!("payment gateway response: {}", e)))?;
        Ok(PaymentIntent {
            intent_id: body.intent_id,
            client_secret: body.client_secret,
        })
    }

    fn initiate_stk_push(
        &self,
        phone: &str,
        amount: &BigDecimal,
        reference: &str,
    ) -> Result<String, DomainError> {
        let resp = self
            .client
            .post(format!("{}/v1/stkpush", self.base_url))
            .json(&json!({
                "phone": phone,
                "amount": amount.to_string(),
                "reference": reference
            }))
            .send()
            .map_err(|e| DomainError::Internal(format!("mpesa gateway: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::Internal(format!(
                "mpesa gateway returned {}",
                resp.status()
            )));
        }

        let body: StkPushResponse = resp
            .json()
            .map_err(|e| DomainError::Internal(format!("mpesa gateway response: {}", e)))?;
        Ok(body.checkout_request_id)
    }
}
