//! Domain types for a refund batch: validated requests, per-row outcomes and
//! the ports the runner talks through.

pub mod outcome;
pub mod ports;
pub mod refund;
