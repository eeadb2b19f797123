use crate::domain::refund::RowError;
use crate::error::{RefundError, Result};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

pub const PAYMENT_ID_COLUMN: &str = "payment_id";
pub const AMOUNT_COLUMN: &str = "amount";

/// Row number of the first data record; the header is row 1.
pub const FIRST_DATA_ROW: usize = 2;

/// The untouched `payment_id` and `amount` fields of one data record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub payment_id: String,
    pub amount: String,
}

/// Reads refund rows from a delimited source with a header row.
///
/// Construction fails if the header lacks either required column (exact,
/// case-sensitive names). Extra columns are ignored, and short records yield
/// empty fields rather than errors.
#[derive(Debug)]
pub struct RefundReader<R: Read> {
    reader: csv::Reader<R>,
    columns: Vec<String>,
    payment_id_idx: usize,
    amount_idx: usize,
}

impl RefundReader<File> {
    /// Opens `path`, mapping a missing file to [`RefundError::InputNotFound`].
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        let file = File::open(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => RefundError::InputNotFound(path.to_path_buf()),
            _ => RefundError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::new(file, delimiter)
    }
}

impl<R: Read> RefundReader<R> {
    pub fn new(source: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(source);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let position = |name: &str| columns.iter().position(|c| c == name);

        match (position(PAYMENT_ID_COLUMN), position(AMOUNT_COLUMN)) {
            (Some(payment_id_idx), Some(amount_idx)) => Ok(Self {
                reader,
                columns,
                payment_id_idx,
                amount_idx,
            }),
            (payment_id, amount) => {
                let missing = [(PAYMENT_ID_COLUMN, payment_id), (AMOUNT_COLUMN, amount)]
                    .into_iter()
                    .filter(|(_, idx)| idx.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(RefundError::InputMalformed {
                    missing,
                    found: columns,
                })
            }
        }
    }

    /// Header names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Lazily yields every data record with its row number.
    ///
    /// A record the CSV layer cannot decode becomes a [`RowError::MalformedRecord`]
    /// for that row only.
    pub fn rows(self) -> impl Iterator<Item = (usize, std::result::Result<RawRow, RowError>)> {
        let payment_id_idx = self.payment_id_idx;
        let amount_idx = self.amount_idx;
        self.reader
            .into_records()
            .enumerate()
            .map(move |(i, record)| {
                let row = i + FIRST_DATA_ROW;
                let raw = record
                    .map(|record| RawRow {
                        payment_id: record.get(payment_id_idx).unwrap_or_default().to_string(),
                        amount: record.get(amount_idx).unwrap_or_default().to_string(),
                    })
                    .map_err(|e| RowError::MalformedRecord(e.to_string()));
                (row, raw)
            })
    }
}
