//! Inference relay: forward a text prompt to a hosted model and get text back.
//!
//! The trait is the seam: the exchange layer and tests substitute stubs, the
//! CLI wires in the Hugging Face implementation.

mod huggingface;

pub use huggingface::HuggingFaceRelay;

use crate::error::ClientError;
use async_trait::async_trait;

/// A single request/response text generation call. No retries, no streaming.
#[async_trait]
pub trait InferenceRelay: Send + Sync {
    /// Generate text for the prompt. Fails with `Validation` on an empty
    /// prompt (no request issued), `Auth` on a rejected token, `Network` on
    /// transport failure.
    async fn generate(&self, prompt: &str) -> Result<String, ClientError>;
}
