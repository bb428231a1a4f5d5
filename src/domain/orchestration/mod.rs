//! Provider orchestration: health probing, fallback execution, streaming, confidence

mod confidence;
mod executor;
mod fallback;
mod health;
mod streaming;

pub use confidence::score_confidence;
pub use executor::FallbackExecutor;
pub use fallback::FallbackResponder;
pub use health::{HealthProber, ProbeOutcome, ProbeStatus, DEFAULT_PROBE_TIMEOUT};
pub use streaming::{ChatStream, StreamingMultiplexer};
