//! HTTP middleware

mod logging;
mod metrics;

pub use logging::{logging_middleware, truncate_for_log, REQUEST_ID_HEADER};
pub use metrics::metrics_middleware;
