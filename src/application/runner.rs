use crate::config::RunSettings;
use crate::domain::outcome::{RefundResponse, RefundResult, RunSummary};
use crate::domain::ports::{RefundServiceBox, ReporterBox};
use crate::domain::refund::{RefundRequest, RowError};
use crate::error::Result;
use crate::interfaces::csv::refund_reader::{RawRow, RefundReader};
use std::path::Path;

/// Where a run currently is. Only a loading failure jumps straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Loading,
    Validating,
    Invoking,
    Summarizing,
    Done,
}

/// Drives one batch of refunds from an input file to a [`RunSummary`].
///
/// Rows are handled strictly one at a time in file order. A bad row or a failed
/// refund call is recorded and the run moves on; only loading the input can fail
/// the run as a whole.
pub struct RefundRunner {
    service: RefundServiceBox,
    reporter: ReporterBox,
    settings: RunSettings,
    phase: RunPhase,
}

impl RefundRunner {
    pub fn new(service: RefundServiceBox, reporter: ReporterBox, settings: RunSettings) -> Self {
        Self {
            service,
            reporter,
            settings,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Processes every row of the file at `input`.
    ///
    /// Returns an error only when the file is missing, unreadable, or lacks the
    /// required columns; no refund is attempted in that case.
    pub async fn run(&mut self, input: &Path) -> Result<RunSummary> {
        self.phase = RunPhase::Loading;
        self.reporter.run_started(self.settings.environment, input);

        let reader = match RefundReader::open(input, self.settings.delimiter) {
            Ok(reader) => reader,
            Err(e) => {
                self.reporter.load_failed(&e);
                self.phase = RunPhase::Done;
                return Err(e);
            }
        };
        self.reporter.columns_found(reader.columns());

        Ok(self.process_rows(reader.rows()).await)
    }

    /// Validates and refunds already-loaded rows.
    pub async fn process_rows<I>(&mut self, rows: I) -> RunSummary
    where
        I: IntoIterator<Item = (usize, std::result::Result<RawRow, RowError>)>,
    {
        self.phase = RunPhase::Validating;
        let mut summary = RunSummary::new();
        let mut accepted = Vec::new();
        let mut seen = 0;

        for (row, raw) in rows {
            seen += 1;
            let parsed = raw.and_then(|raw| {
                RefundRequest::parse(&raw.payment_id, &raw.amount, &self.settings.currency)
            });
            match parsed {
                Ok(request) => accepted.push((row, request)),
                Err(reason) => {
                    self.reporter.row_rejected(row, &reason);
                    summary.record(RefundResult::failed(row, reason.to_string()));
                }
            }
        }
        self.reporter.rows_accepted(accepted.len(), seen);

        self.phase = RunPhase::Invoking;
        let count = accepted.len();
        for (i, (row, request)) in accepted.into_iter().enumerate() {
            self.reporter.refund_started(i + 1, count, row, &request);
            let result = self.invoke(row, &request).await;
            self.reporter.refund_finished(&request, &result);
            summary.record(result);
        }

        self.phase = RunPhase::Summarizing;
        summary.finalize();
        self.reporter.run_finished(&summary);
        self.phase = RunPhase::Done;
        summary
    }

    async fn invoke(&self, row: usize, request: &RefundRequest) -> RefundResult {
        let response = self
            .service
            .refund(request.payment_id(), request.amount(), &self.settings.currency)
            .await;

        match response {
            Ok(RefundResponse::Accepted { refund_id, status }) => {
                RefundResult::succeeded(row, refund_id, status)
            }
            Ok(RefundResponse::Declined {
                error_kind,
                message,
            }) => {
                let message = if message.is_empty() { error_kind } else { message };
                RefundResult::failed(row, message)
            }
            Err(fault) => RefundResult::failed(row, format!("Unexpected error: {fault}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::domain::outcome::Outcome;
    use crate::domain::ports::{Reporter, ServiceFault};
    use crate::error::RefundError;
    use crate::infrastructure::in_memory::InMemoryRefundService;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingReporter {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingReporter {
        fn push(&self, line: String) {
            self.lines.lock().unwrap().push(line);
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn run_started(&self, environment: Environment, input: &Path) {
            self.push(format!("start {environment} {}", input.display()));
        }
        fn columns_found(&self, columns: &[String]) {
            self.push(format!("columns {}", columns.join(",")));
        }
        fn load_failed(&self, error: &RefundError) {
            self.push(format!("fatal {error}"));
        }
        fn row_rejected(&self, row: usize, reason: &RowError) {
            self.push(format!("rejected {row} {reason}"));
        }
        fn rows_accepted(&self, valid: usize, total: usize) {
            self.push(format!("accepted {valid}/{total}"));
        }
        fn refund_started(&self, position: usize, of: usize, row: usize, request: &RefundRequest) {
            self.push(format!("before {position}/{of} row {row} {}", request.payment_id()));
        }
        fn refund_finished(&self, _request: &RefundRequest, result: &RefundResult) {
            self.push(format!("after row {} {:?}", result.source_row_number, result.outcome));
        }
        fn run_finished(&self, summary: &RunSummary) {
            self.push(format!(
                "summary {}/{}/{}",
                summary.total_rows, summary.succeeded, summary.failed
            ));
        }
    }

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    fn runner(service: &InMemoryRefundService, reporter: &RecordingReporter) -> RefundRunner {
        RefundRunner::new(
            Box::new(service.clone()),
            Box::new(reporter.clone()),
            RunSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_declined_row_does_not_stop_batch() {
        let input = csv_file("payment_id,amount\nPAY_1,10.00\nPAY_2,5.00\nPAY_3,7.50\n");
        let service =
            InMemoryRefundService::new().decline("PAY_2", "NOT_FOUND", "Payment not found.");
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!((summary.total_rows, summary.succeeded, summary.failed), (3, 2, 1));
        assert_eq!(summary.results[0].outcome, Outcome::Success);
        assert_eq!(summary.results[1].outcome, Outcome::Failure);
        assert!(
            summary.results[1]
                .error_message
                .as_deref()
                .unwrap()
                .contains("not found")
        );
        assert_eq!(summary.results[2].outcome, Outcome::Success);
        assert_eq!(service.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_invalid_amounts_skip_the_service() {
        let input = csv_file("payment_id,amount\nPAY_1,-5.00\nPAY_2,0\nPAY_3,abc\nPAY_4,12.34\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!((summary.total_rows, summary.succeeded, summary.failed), (4, 1, 3));
        let calls = service.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].payment_id, "PAY_4");
        assert!(summary.result_for_row(5).unwrap().is_success());
        for row in 2..=4 {
            assert_eq!(summary.result_for_row(row).unwrap().outcome, Outcome::Failure);
        }
    }

    #[tokio::test]
    async fn test_whitespace_payment_id_is_rejected() {
        let input = csv_file("payment_id,amount\n   ,10.00\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.results[0].error_message.as_deref(),
            Some("empty payment id")
        );
        assert_eq!(service.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_amount_column_is_fatal() {
        let input = csv_file("payment_id,total\nPAY_1,10.00\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();
        let mut runner = runner(&service, &reporter);

        let err = runner.run(input.path()).await.unwrap_err();

        assert!(matches!(err, RefundError::InputMalformed { .. }));
        assert_eq!(service.call_count().await, 0);
        assert_eq!(runner.phase(), RunPhase::Done);
        let lines = reporter.lines();
        assert!(lines.last().unwrap().starts_with("fatal"));
        assert!(!lines.iter().any(|l| l.starts_with("summary")));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let err = runner(&service, &reporter)
            .run(Path::new("no/such/refunds.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, RefundError::InputNotFound(_)));
        assert_eq!(service.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_service_fault_is_isolated() {
        let input = csv_file("payment_id,amount\nPAY_1,1\nPAY_2,2\n");
        let service = InMemoryRefundService::new()
            .respond_with("PAY_1", Err(ServiceFault::Transport("operation timed out".into())));
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        let failed = summary.result_for_row(2).unwrap();
        assert_eq!(
            failed.error_message.as_deref(),
            Some("Unexpected error: request failed: operation timed out")
        );
        assert!(summary.result_for_row(3).unwrap().is_success());
    }

    #[tokio::test]
    async fn test_events_in_order_with_header_as_row_one() {
        let input = csv_file("payment_id,amount\nPAY_1,10.00\n,3\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();
        let mut runner = runner(&service, &reporter);

        runner.run(input.path()).await.unwrap();

        let lines = reporter.lines();
        assert!(lines[0].starts_with("start sandbox"));
        assert_eq!(
            lines[1..],
            [
                "columns payment_id,amount",
                "rejected 3 empty payment id",
                "accepted 1/2",
                "before 1/1 row 2 PAY_1",
                "after row 2 Success",
                "summary 2/1/1",
            ]
        );
        assert_eq!(runner.phase(), RunPhase::Done);
    }

    #[tokio::test]
    async fn test_summary_produced_when_every_row_fails() {
        let input = csv_file("payment_id,amount\n,1\nPAY_2,nope\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!((summary.total_rows, summary.succeeded, summary.failed), (2, 0, 2));
        assert!(reporter.lines().iter().any(|l| l == "summary 2/0/2"));
    }

    #[tokio::test]
    async fn test_rerun_yields_same_counts() {
        let input = csv_file("payment_id,amount\nPAY_1,1\nPAY_2,x\nPAY_3,3\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let first = runner(&service, &reporter).run(input.path()).await.unwrap();
        let second = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!(
            (first.total_rows, first.succeeded, first.failed),
            (second.total_rows, second.succeeded, second.failed)
        );
    }

    #[tokio::test]
    async fn test_currency_reaches_the_service() {
        let input = csv_file("payment_id,amount\nPAY_1,1500\n");
        let service = InMemoryRefundService::new();
        let settings = RunSettings {
            currency: "JPY".parse().unwrap(),
            ..RunSettings::default()
        };
        let mut runner = RefundRunner::new(
            Box::new(service.clone()),
            Box::new(RecordingReporter::default()),
            settings,
        );

        runner.run(input.path()).await.unwrap();

        assert_eq!(service.calls().await[0].currency.as_str(), "JPY");
    }

    #[tokio::test]
    async fn test_process_rows_records_malformed_records() {
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();
        let rows = vec![
            (2, Err(RowError::MalformedRecord("invalid utf-8".into()))),
            (
                3,
                Ok(RawRow {
                    payment_id: "PAY_1".into(),
                    amount: "4.00".into(),
                }),
            ),
        ];

        let summary = runner(&service, &reporter).process_rows(rows).await;

        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        assert_eq!(
            summary.results[0].error_message.as_deref(),
            Some("malformed record: invalid utf-8")
        );
    }

    #[tokio::test]
    async fn test_amount_finer_than_currency_never_reaches_service() {
        let input = csv_file("payment_id,amount\nPAY_1,1.005\nPAY_2,1.01\n");
        let service = InMemoryRefundService::new();
        let reporter = RecordingReporter::default();

        let summary = runner(&service, &reporter).run(input.path()).await.unwrap();

        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        assert_eq!(
            summary.result_for_row(2).unwrap().error_message.as_deref(),
            Some("invalid amount 1.005: more decimal places than USD allows")
        );
        let calls = service.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].payment_id, "PAY_2");
    }
}
