pub mod refund_reader;
