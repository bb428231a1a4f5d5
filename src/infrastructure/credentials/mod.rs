//! API key lookup for provider clients

mod env_provider;

pub use env_provider::{is_valid_api_key, CredentialSource, EnvCredentialSource};

#[cfg(test)]
pub use env_provider::mock::StaticCredentialSource;
