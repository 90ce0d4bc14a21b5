//! Chat intent extraction.
//!
//! Each [`Intent`] names one action the agent can run. An
//! [`IntentExtractor`] turns recent conversation into a JSON object of
//! parameters, and [`ActionRequest::parse`] resolves that object into typed
//! parameters with defaults applied.

pub mod config;
pub mod error;
pub mod extractor;
pub mod http;
pub mod intent;
pub mod mock;
pub mod params;
pub mod template;

pub use config::IntentConfig;
pub use error::IntentError;
pub use extractor::IntentExtractor;
pub use http::HttpIntentExtractor;
pub use intent::{Intent, PromptExample, PromptField};
pub use mock::{FailingIntentExtractor, MockIntentExtractor};
pub use params::{ActionRequest, CollectionParams, Fields, default_collection_name};
pub use template::render_prompt;
