use std::env;
use std::fmt::Debug;

const MIN_KEY_LENGTH: usize = 10;
const PLACEHOLDER_MARKERS: [&str; 3] = ["your-", "sk-your", "PLACEHOLDER"];

/// Rejects empty, short and template keys such as `sk-your-key-here`
pub fn is_valid_api_key(key: &str) -> bool {
    let key = key.trim();

    key.len() >= MIN_KEY_LENGTH && !PLACEHOLDER_MARKERS.iter().any(|m| key.contains(m))
}

/// Where provider API keys come from
pub trait CredentialSource: Send + Sync + Debug {
    /// Raw value stored under `name`, if any
    fn lookup(&self, name: &str) -> Option<String>;

    /// The key under `name`, only if it passes validation
    fn api_key(&self, name: &str) -> Option<String> {
        self.lookup(name)
            .map(|k| k.trim().to_string())
            .filter(|k| is_valid_api_key(k))
    }
}

/// Reads keys from process environment variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn lookup(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}
