//! Per-model price table in USD per 1K tokens

pub const DEFAULT_PRICE_PER_1K: f64 = 0.01;

const PRICES_PER_1K: [(&str, f64); 9] = [
    ("gpt-4", 0.03),
    ("gpt-4-turbo", 0.01),
    ("gpt-3.5-turbo", 0.0015),
    ("claude-3-opus", 0.015),
    ("claude-3-sonnet", 0.003),
    ("claude-3-haiku", 0.00025),
    ("gemini-pro", 0.00125),
    ("mixtral-8x7b", 0.0007),
    ("llama-3", 0.0004),
];

/// Price for `model`, matched on the longest known prefix
pub fn price_per_1k(model: &str) -> f64 {
    let model = model.to_lowercase();

    PRICES_PER_1K
        .iter()
        .filter(|(name, _)| model.starts_with(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE_PER_1K)
}

pub fn estimate_cost(model: &str, tokens: u32) -> f64 {
    tokens as f64 / 1000.0 * price_per_1k(model)
}
