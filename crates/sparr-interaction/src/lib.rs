//! Agent backends for SPARR.
//!
//! - `settings`: environment-driven connection settings
//! - `prompts`: minijinja prompt templates per call purpose
//! - `openai_api_invoker`: [`OpenAIApiInvoker`], the HTTP agent backend

pub mod openai_api_invoker;
pub mod prompts;
pub mod settings;

pub use openai_api_invoker::OpenAIApiInvoker;
pub use prompts::{PromptError, PromptRenderer, RenderedPrompt};
pub use settings::{InvokerSettings, SettingsError};
