//! Adapters behind the domain ports: the Square HTTP client, the in-process
//! service used for dry runs, and the run's log session.

pub mod in_memory;
pub mod logging;
pub mod square;
