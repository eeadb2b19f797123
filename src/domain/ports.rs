use super::outcome::{RefundResponse, RefundResult, RunSummary};
use super::refund::{Amount, CurrencyCode, RefundRequest, RowError};
use crate::config::Environment;
use crate::error::RefundError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::Path;
use thiserror::Error;

/// A refund call that failed without a structured answer from the service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceFault {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response (HTTP {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
    #[error("amount {amount} cannot be expressed in {currency} minor units")]
    AmountConversion { amount: Decimal, currency: String },
}

/// The remote capability that actually moves money back to the buyer.
#[async_trait]
pub trait RefundService: Send + Sync {
    async fn refund(
        &self,
        payment_id: &str,
        amount: Amount,
        currency: &CurrencyCode,
    ) -> Result<RefundResponse, ServiceFault>;
}

/// Sink for run progress. Implementations hold no decision logic.
pub trait Reporter: Send + Sync {
    fn run_started(&self, environment: Environment, input: &Path);
    fn columns_found(&self, columns: &[String]);
    fn load_failed(&self, error: &RefundError);
    fn row_rejected(&self, row: usize, reason: &RowError);
    fn rows_accepted(&self, valid: usize, total: usize);
    fn refund_started(&self, position: usize, of: usize, row: usize, request: &RefundRequest);
    fn refund_finished(&self, request: &RefundRequest, result: &RefundResult);
    fn run_finished(&self, summary: &RunSummary);
}

pub type RefundServiceBox = Box<dyn RefundService>;
pub type ReporterBox = Box<dyn Reporter>;
