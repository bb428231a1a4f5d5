//! Heuristic trust score for a completion

const BASE_SCORE: f32 = 0.7;
const LENGTH_BONUS: f32 = 0.1;
const STRUCTURE_BONUS: f32 = 0.05;
const MEDIUM_LENGTH: usize = 100;
const LONG_LENGTH: usize = 300;
const STRUCTURE_MARKERS: [&str; 3] = ["•", "**", "###"];

/// Bonus for providers with a known track record, matched on the display name
fn provider_bonus(provider: &str) -> f32 {
    match provider.trim().to_lowercase().as_str() {
        "openai" | "anthropic" => 0.1,
        "groq" | "google ai" | "google" | "cohere" => 0.05,
        _ => 0.0,
    }
}

/// Deterministic score in [0, 1] for `content` produced by `provider`
pub fn score_confidence(content: &str, provider: &str) -> f32 {
    let length = content.chars().count();
    let mut score = BASE_SCORE;

    if length > MEDIUM_LENGTH {
        score += LENGTH_BONUS;
    }

    if length > LONG_LENGTH {
        score += LENGTH_BONUS;
    }

    score += provider_bonus(provider);

    if STRUCTURE_MARKERS.iter().any(|m| content.contains(m)) {
        score += STRUCTURE_BONUS;
    }

    score.clamp(0.0, 1.0)
}
