//! Application layer orchestrating a refund batch.
//!
//! `RefundRunner` loads the input, validates every row, then calls the Refund
//! Service for each valid row in file order, isolating failures per row.

pub mod runner;
