//! Core library: employee table loading, structured lookups, retrieval-augmented answers.

pub mod answerer;
pub mod config;
pub mod documentizer;
pub mod embeddings;
pub mod error;
pub mod intent;
pub mod models;
pub mod pipeline;
pub mod query_engine;
pub mod router;
pub mod table;
#[cfg(test)]
mod test_support;
pub mod vectorindex;

pub use error::QueryError;
pub use models::{Answer, AnswerRoute, Document, EmployeeRecord};
pub use router::QueryService;
