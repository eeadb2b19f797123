use crate::config::{AccessToken, DEFAULT_REASON, Environment};
use crate::domain::outcome::RefundResponse;
use crate::domain::ports::{RefundService, ServiceFault};
use crate::domain::refund::{Amount, CurrencyCode};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// API version pinned in every request.
pub const SQUARE_VERSION: &str = "2024-07-17";
const TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct SquareRefundRequest<'a> {
    idempotency_key: String,
    amount_money: SquareMoney<'a>,
    payment_id: &'a str,
    reason: &'a str,
}

#[derive(Debug, Serialize)]
struct SquareMoney<'a> {
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct SquareRefundResponse {
    refund: SquareRefundDetails,
}

#[derive(Debug, Deserialize)]
struct SquareRefundDetails {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct SquareErrorDetails {
    category: Option<String>,
    code: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SquareErrorResponse {
    #[serde(default)]
    errors: Vec<SquareErrorDetails>,
}

/// Refund Service backed by the Square `POST /v2/refunds` endpoint.
///
/// Each call carries a fresh idempotency key and is sent exactly once.
#[derive(Debug)]
pub struct SquareRefundClient {
    client: Client,
    base_url: String,
    token: AccessToken,
    reason: String,
}

impl SquareRefundClient {
    pub fn new(base_url: impl Into<String>, token: AccessToken) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
            reason: DEFAULT_REASON.to_string(),
        })
    }

    pub fn for_environment(environment: Environment, token: AccessToken) -> Result<Self> {
        Self::new(environment.base_url(), token)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    fn refunds_url(&self) -> String {
        format!("{}v2/refunds", self.base_url)
    }
}

#[async_trait]
impl RefundService for SquareRefundClient {
    async fn refund(
        &self,
        payment_id: &str,
        amount: Amount,
        currency: &CurrencyCode,
    ) -> std::result::Result<RefundResponse, ServiceFault> {
        let minor_units =
            amount
                .to_minor_units(currency)
                .ok_or_else(|| ServiceFault::AmountConversion {
                    amount: amount.value(),
                    currency: currency.to_string(),
                })?;

        let body = SquareRefundRequest {
            idempotency_key: Uuid::new_v4().to_string(),
            amount_money: SquareMoney {
                amount: minor_units,
                currency: currency.as_str(),
            },
            payment_id,
            reason: &self.reason,
        };

        let response = self
            .client
            .post(self.refunds_url())
            .bearer_auth(self.token.expose())
            .header("Square-Version", SQUARE_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceFault::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceFault::Transport(e.to_string()))?;

        interpret_response(status, &text)
    }
}

/// Maps an HTTP answer from the refunds endpoint onto the closed outcome set.
fn interpret_response(
    status: StatusCode,
    body: &str,
) -> std::result::Result<RefundResponse, ServiceFault> {
    let unexpected = || ServiceFault::UnexpectedResponse {
        status: status.as_u16(),
        body: body.to_string(),
    };

    if status.is_success() {
        let parsed: SquareRefundResponse = serde_json::from_str(body).map_err(|_| unexpected())?;
        return Ok(RefundResponse::Accepted {
            refund_id: parsed.refund.id,
            status: parsed.refund.status,
        });
    }

    let parsed: SquareErrorResponse = serde_json::from_str(body).map_err(|_| unexpected())?;
    let Some(first) = parsed.errors.first() else {
        return Err(unexpected());
    };

    let error_kind = first
        .code
        .clone()
        .or_else(|| first.category.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let message = parsed
        .errors
        .iter()
        .map(|e| {
            format!(
                "{}: {}",
                e.code.as_deref().unwrap_or("UNKNOWN"),
                e.detail.as_deref().unwrap_or("No details")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    Ok(RefundResponse::Declined {
        error_kind,
        message,
    })
}
