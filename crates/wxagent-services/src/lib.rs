//! Upstream collaborators of the weather agent.
//!
//! - [`source`]: the `WeatherSource` seam and its error type
//! - [`gsod`]: NOAA GSOD daily observations through the BigQuery REST API
//! - [`token`]: Google OAuth access tokens for BigQuery
//! - [`narrative`]: the `NarrativeGenerator` seam and its error type
//! - [`huggingface`]: Hugging Face Inference API text generation
//! - [`prompt`]: prompt construction from a statistics summary
//!
//! Service errors convert into `wxagent_core::AppError` via `From`.

mod error_mapping;
pub mod gsod;
pub mod huggingface;
pub mod narrative;
pub mod prompt;
pub mod source;
pub mod token;

pub use gsod::GsodClient;
pub use huggingface::HuggingFaceClient;
pub use narrative::{GenerationError, NarrativeGenerator, NarrativeRequest};
pub use source::{SourceError, WeatherSource};
pub use token::{TokenError, TokenProvider};
