//! Provider registry: routing policy plus the client handle per vendor

mod config;
mod registry;

pub use config::ProviderConfig;
pub use registry::{ProviderHandle, ProviderRegistry, RegisteredProvider};
