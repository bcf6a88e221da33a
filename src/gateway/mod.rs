/// Generation gateway
///
/// The one external call that produces pixels: given a credential, a
/// source portrait, a feature configuration and a seed, return a
/// generated image or a human-readable failure.
///
/// - `gemini.rs` - HTTP implementation against the Gemini API

pub mod gemini;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use crate::state::data::{GeneratedImage, SourceImage};
use crate::state::features::FeatureConfiguration;

pub use gemini::GeminiGateway;

/// Seeds are drawn from `0..SEED_RANGE`
pub const SEED_RANGE: u32 = 10_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Generation service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("The generation service returned no image")]
    EmptyResponse,
    #[error("{0}")]
    Failed(String),
}

/// Everything one generation call needs.
///
/// `ticket` identifies the in-flight call inside the session; gateways
/// ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub ticket: u64,
    pub credential: String,
    pub source: SourceImage,
    pub features: FeatureConfiguration,
    pub seed: u32,
}

/// A service that turns a portrait into a generated headshot.
///
/// One call is one atomic unit of work: no partial results, no retry.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GatewayError>;
}

/// Draw a fresh seed uniformly from `0..SEED_RANGE`
pub fn random_seed() -> u32 {
    rand::rng().random_range(0..SEED_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_in_range() {
        for _ in 0..1_000 {
            assert!(random_seed() < SEED_RANGE);
        }
    }

    #[test]
    fn test_failed_displays_bare_message() {
        let err = GatewayError::Failed("quota exceeded".to_string());
        assert_eq!(err.to_string(), "quota exceeded");
    }
}
