/// What the Refund Service said about one refund call.
///
/// Transport-level problems are not represented here; they surface as a
/// [`crate::domain::ports::ServiceFault`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum RefundResponse {
    /// The service created the refund (completed or still pending).
    Accepted { refund_id: String, status: String },
    /// The service refused the refund with a structured error.
    Declined { error_kind: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// The recorded outcome of one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundResult {
    pub outcome: Outcome,
    pub refund_id: Option<String>,
    pub status: Option<String>,
    pub error_message: Option<String>,
    pub source_row_number: usize,
}

impl RefundResult {
    pub fn succeeded(row: usize, refund_id: String, status: String) -> Self {
        Self {
            outcome: Outcome::Success,
            refund_id: Some(refund_id),
            status: Some(status),
            error_message: None,
            source_row_number: row,
        }
    }

    pub fn failed(row: usize, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            refund_id: None,
            status: None,
            error_message: Some(message.into()),
            source_row_number: row,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Totals and per-row results for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_rows: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<RefundResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: RefundResult) {
        self.total_rows += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Orders results by source row. Stable, so equal rows keep insertion order.
    pub fn finalize(&mut self) {
        self.results.sort_by_key(|r| r.source_row_number);
    }

    /// Percentage of rows that succeeded, or `None` for an empty run.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_rows > 0).then(|| self.succeeded as f64 / self.total_rows as f64 * 100.0)
    }

    pub fn result_for_row(&self, row: usize) -> Option<&RefundResult> {
        self.results.iter().find(|r| r.source_row_number == row)
    }
}
