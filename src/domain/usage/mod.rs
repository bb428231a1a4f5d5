//! Token cost estimation

mod pricing;

pub use pricing::{estimate_cost, price_per_1k, DEFAULT_PRICE_PER_1K};
