use crate::config::Environment;
use crate::domain::outcome::{RefundResult, RunSummary};
use crate::domain::ports::Reporter;
use crate::domain::refund::{CurrencyCode, RefundRequest, RowError};
use crate::error::{RefundError, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::subscriber::DefaultGuard;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, time::ChronoLocal};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

pub const LOG_FILE_PREFIX: &str = "square_refunds";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Console and file logging for one run.
///
/// Opening the session creates a fresh log file and installs a subscriber for the
/// current thread only. Dropping it restores the previous subscriber and flushes
/// whatever the file writer still has queued.
pub struct LogSession {
    path: PathBuf,
    _subscriber: DefaultGuard,
    _file_guard: WorkerGuard,
}

impl LogSession {
    pub fn open(dir: &Path, started_at: DateTime<Local>) -> Result<Self> {
        let stem = format!("{LOG_FILE_PREFIX}_{}", started_at.format("%Y%m%d_%H%M%S"));
        let (path, file) = create_log_file(dir, &stem).map_err(|source| RefundError::LogSetup {
            dir: dir.to_path_buf(),
            source,
        })?;

        let (file_writer, file_guard) = tracing_appender::non_blocking(file);
        let file_layer = fmt::layer()
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .with_target(false)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::INFO);
        let console_layer = fmt::layer()
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .with_target(false)
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .with_filter(LevelFilter::INFO);

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);
        let guard = tracing::subscriber::set_default(subscriber);

        info!("Logging initialized. Log file: {}", path.display());

        Ok(Self {
            path,
            _subscriber: guard,
            _file_guard: file_guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create_log_file(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match attempt {
            0 => format!("{stem}.log"),
            n => format!("{stem}_{n}.log"),
        };
        let path = dir.join(name);
        match OpenOptions::new().append(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free log file name for {stem}"),
    ))
}

/// [`Reporter`] that turns run events into `tracing` lines.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    currency: CurrencyCode,
}

impl TracingReporter {
    pub fn new(currency: CurrencyCode) -> Self {
        Self { currency }
    }
}

impl Reporter for TracingReporter {
    fn run_started(&self, environment: Environment, input: &Path) {
        info!("Square environment: {environment}");
        info!("Starting refund processing from: {}", input.display());
    }

    fn columns_found(&self, columns: &[String]) {
        info!("CSV columns found: {}", columns.join(", "));
    }

    fn load_failed(&self, error: &RefundError) {
        match error {
            RefundError::InputMalformed { found, .. } => {
                error!("CSV file format issue. Found columns: {}", found.join(", "));
                error!("Expected columns: payment_id, amount");
                error!("Common issues:");
                error!("- Extra empty lines at the beginning of the file");
                error!("- Incorrect column names (case sensitive)");
                error!("- Missing header row");
                error!("{error}");
            }
            _ => error!("{error}"),
        }
    }

    fn row_rejected(&self, row: usize, reason: &RowError) {
        error!("✗ Row {row} rejected - {reason}");
    }

    fn rows_accepted(&self, valid: usize, total: usize) {
        if valid == 0 {
            warn!("No valid refund data found in CSV ({total} data rows)");
        } else {
            info!("Successfully read {valid} valid refund entries from CSV ({total} data rows)");
        }
    }

    fn refund_started(&self, position: usize, of: usize, row: usize, request: &RefundRequest) {
        info!(
            "Processing refund {position}/{of} - Row {row} - Payment ID: {}, Amount: {} {}",
            request.payment_id(),
            request.amount().display_in(&self.currency),
            self.currency
        );
    }

    fn refund_finished(&self, request: &RefundRequest, result: &RefundResult) {
        let row = result.source_row_number;
        if result.is_success() {
            info!(
                "✓ Refund successful - Row {row} - Refund ID: {}, Status: {}, Amount: {} {}",
                result.refund_id.as_deref().unwrap_or_default(),
                result.status.as_deref().unwrap_or_default(),
                request.amount().display_in(&self.currency),
                self.currency
            );
        } else {
            error!(
                "✗ Refund failed - Row {row} - Payment ID: {}, Amount: {} {}, Error: {}",
                request.payment_id(),
                request.amount().display_in(&self.currency),
                self.currency,
                result.error_message.as_deref().unwrap_or("No details")
            );
        }
    }

    fn run_finished(&self, summary: &RunSummary) {
        info!("=== PROCESSING COMPLETE ===");
        info!("Total rows processed: {}", summary.total_rows);
        info!("Successful refunds: {}", summary.succeeded);
        info!("Failed refunds: {}", summary.failed);
        if let Some(rate) = summary.success_rate() {
            info!("Success rate: {rate:.1}%");
        }
    }
}
