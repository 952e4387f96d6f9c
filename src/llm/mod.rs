pub mod client;
pub mod context;
pub mod integration;
pub mod prompts;
pub mod tools;

pub use client::*;
pub use context::*;
pub use integration::{IntegrationError, LLMIntegration};
pub use prompts::*;
pub use tools::*;
