use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole run before any row is processed.
#[derive(Error, Diagnostic, Debug)]
pub enum RefundError {
    #[error("CSV file not found: {}", .0.display())]
    #[diagnostic(code(batch_refund::input_not_found))]
    InputNotFound(PathBuf),

    #[error("Error reading CSV file {}: {source}", path.display())]
    #[diagnostic(code(batch_refund::input_unreadable))]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required columns: {}. Found columns: {}", missing.join(", "), found.join(", "))]
    #[diagnostic(
        code(batch_refund::input_malformed),
        help(
            "Expected columns: payment_id, amount. Common issues: extra empty lines at the \
             beginning of the file, incorrect column names (case sensitive), missing header row"
        )
    )]
    InputMalformed {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("CSV error: {0}")]
    #[diagnostic(code(batch_refund::csv))]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(batch_refund::io))]
    Io(#[from] std::io::Error),

    #[error("Could not build HTTP client: {0}")]
    #[diagnostic(code(batch_refund::http_client))]
    HttpClient(#[from] reqwest::Error),

    #[error("Could not open log file in {}: {source}", dir.display())]
    #[diagnostic(code(batch_refund::log_setup))]
    LogSetup {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RefundError>;
