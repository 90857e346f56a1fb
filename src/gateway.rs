//! Order submission client for the EasyDrop gateway.
//!
//! POST {gateway}/api/checkout with the partner's API key in `x-api-key`.
//! One attempt per call; callers serialize submissions themselves.

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use crate::models::{FetchResponse, OrderReference, OrderSubmission};

pub const CHECKOUT_PATH: &str = "/api/checkout";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway rejected the order ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        errors: Vec<String>,
    },

    #[error("gateway response carries no order reference")]
    MissingReference,
}

pub struct GatewayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHECKOUT_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit an order and return the reference the gateway assigned to it.
    pub async fn submit(
        &self,
        api_key: &str,
        order: &OrderSubmission,
    ) -> Result<OrderReference, SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(order)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope: Option<FetchResponse<Value>> = serde_json::from_str(&text).ok();

        let envelope = match envelope {
            Some(envelope) if status.is_success() && envelope.success => envelope,
            Some(envelope) => {
                error!("Gateway rejected order: {} {}", status, envelope.message);
                return Err(SubmitError::Rejected {
                    status: status.as_u16(),
                    message: envelope.message,
                    errors: envelope.errors,
                });
            }
            None => {
                error!("Gateway returned {} with unreadable body", status);
                return Err(SubmitError::Rejected {
                    status: status.as_u16(),
                    message: if text.is_empty() {
                        status.to_string()
                    } else {
                        text
                    },
                    errors: Vec::new(),
                });
            }
        };

        let reference = envelope
            .data
            .as_ref()
            .and_then(order_reference)
            .ok_or(SubmitError::MissingReference)?;

        info!("Gateway accepted order {}", reference);
        Ok(reference)
    }
}

/// The gateway returns either the reference itself or the created order.
fn order_reference(data: &Value) -> Option<OrderReference> {
    let scalar = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    let reference = match data {
        Value::Object(fields) => ["id", "order_id", "_id", "reference"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(scalar)),
        other => scalar(other),
    };
    reference.map(OrderReference)
}
