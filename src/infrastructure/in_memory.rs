use crate::domain::outcome::RefundResponse;
use crate::domain::ports::{RefundService, ServiceFault};
use crate::domain::refund::{Amount, CurrencyCode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A refund call as seen by [`InMemoryRefundService`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub payment_id: String,
    pub amount: Amount,
    pub currency: CurrencyCode,
}

/// An in-process Refund Service.
///
/// Payment ids without a scripted answer are accepted with a synthetic refund id.
/// Amounts that do not fit the currency's minor units are refused the same way
/// the live service refuses them. Scripts are fixed once built; clones share the
/// call log. Used for `--dry-run` and as a test double.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRefundService {
    scripted: HashMap<String, Result<RefundResponse, ServiceFault>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    next_id: Arc<AtomicUsize>,
}

impl InMemoryRefundService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the answer for every refund of `payment_id`.
    pub fn respond_with(
        mut self,
        payment_id: impl Into<String>,
        response: Result<RefundResponse, ServiceFault>,
    ) -> Self {
        self.scripted.insert(payment_id.into(), response);
        self
    }

    /// Scripts a structured decline for `payment_id`.
    pub fn decline(self, payment_id: impl Into<String>, code: &str, detail: &str) -> Self {
        self.respond_with(
            payment_id,
            Ok(RefundResponse::Declined {
                error_kind: code.to_string(),
                message: format!("{code}: {detail}"),
            }),
        )
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl RefundService for InMemoryRefundService {
    async fn refund(
        &self,
        payment_id: &str,
        amount: Amount,
        currency: &CurrencyCode,
    ) -> Result<RefundResponse, ServiceFault> {
        self.calls.write().await.push(RecordedCall {
            payment_id: payment_id.to_string(),
            amount,
            currency: currency.clone(),
        });

        if amount.to_minor_units(currency).is_none() {
            return Err(ServiceFault::AmountConversion {
                amount: amount.value(),
                currency: currency.to_string(),
            });
        }

        if let Some(response) = self.scripted.get(payment_id) {
            return response.clone();
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RefundResponse::Accepted {
            refund_id: format!("dry-run-{n}"),
            status: "PENDING".to_string(),
        })
    }
}
