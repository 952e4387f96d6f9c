pub mod commerce;
pub mod config;
pub mod console;
pub mod error;
pub mod fraud;
pub mod llm;
pub mod persona;
pub mod store;

pub use error::{AgentError, Result};
pub use persona::Persona;
