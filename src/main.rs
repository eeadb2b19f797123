use batch_refund::application::runner::RefundRunner;
use batch_refund::config::{AccessToken, DEFAULT_REASON, Environment, RunSettings};
use batch_refund::domain::ports::{RefundServiceBox, ReporterBox};
use batch_refund::domain::refund::CurrencyCode;
use batch_refund::infrastructure::in_memory::InMemoryRefundService;
use batch_refund::infrastructure::logging::{LogSession, TracingReporter};
use batch_refund::infrastructure::square::SquareRefundClient;
use chrono::Local;
use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use tracing::{error, info, warn};

const AFTER_HELP: &str = "\
CSV format:
    payment_id,amount
    PAYMENT_ID_1,10.50
    PAYMENT_ID_2,25.00

Examples:
    batch-refund --csv refunds.csv --token YOUR_ACCESS_TOKEN
    batch-refund --csv refunds.csv --token YOUR_ACCESS_TOKEN --environment production";

#[derive(Parser)]
#[command(author, version, about = "Process Square refunds from a CSV file", long_about = None, after_help = AFTER_HELP)]
struct Cli {
    /// Path to CSV file containing payment_id and amount columns
    #[arg(long, value_name = "PATH")]
    csv: PathBuf,

    /// Square API access token
    #[arg(long, env = "SQUARE_ACCESS_TOKEN", hide_env_values = true)]
    token: AccessToken,

    /// Square API environment
    #[arg(long, value_enum, default_value_t = Environment::Sandbox)]
    environment: Environment,

    /// ISO 4217 currency of the amounts in the file
    #[arg(long, default_value = "USD")]
    currency: CurrencyCode,

    /// Reason attached to every refund
    #[arg(long, default_value = DEFAULT_REASON)]
    reason: String,

    /// Field delimiter of the input file
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Directory that receives the run's log file
    #[arg(long, value_name = "DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Validate and report every row without issuing refunds
    #[arg(long)]
    dry_run: bool,

    #[arg(long, hide = true)]
    base_url: Option<String>,
}

fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("'{s}' is not a single ASCII character")),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session = LogSession::open(&cli.log_dir, Local::now())?;

    let service: RefundServiceBox = if cli.dry_run {
        info!("Dry run: rows are validated but no refunds are issued");
        Box::new(InMemoryRefundService::new())
    } else {
        let client = match cli.base_url {
            Some(base_url) => SquareRefundClient::new(base_url, cli.token),
            None => SquareRefundClient::for_environment(cli.environment, cli.token),
        }
        .inspect_err(|e| error!("{e}"))?
        .with_reason(cli.reason);
        Box::new(client)
    };
    let reporter: ReporterBox = Box::new(TracingReporter::new(cli.currency.clone()));

    let settings = RunSettings {
        environment: cli.environment,
        currency: cli.currency,
        delimiter: cli.delimiter,
    };
    let mut runner = RefundRunner::new(service, reporter, settings);
    let summary = runner.run(&cli.csv).await?;

    if summary.failed > 0 {
        warn!(
            "{} refunds failed. Check the log file for details: {}",
            summary.failed,
            session.path().display()
        );
    } else {
        info!("All {} refunds processed successfully.", summary.succeeded);
    }

    Ok(())
}
