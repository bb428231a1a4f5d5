//! Infrastructure services

mod fallback_responder;
mod gateway_service;

pub use fallback_responder::{
    StaticFallbackResponder, DEFAULT_FALLBACK_MESSAGE, DEFAULT_FALLBACK_NAME,
};
pub use gateway_service::{ChatGatewayService, FALLBACK_CONFIDENCE, FALLBACK_MODEL};
