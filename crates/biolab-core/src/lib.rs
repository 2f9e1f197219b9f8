//! biolab-core: Domain model, quiz engine, assessment pipeline and session flow.
//!
//! Everything here talks to the AI boundary through the [`traits::LlmProvider`]
//! trait; concrete HTTP providers live in `biolab-providers`.

pub mod aggregate;
pub mod assessment;
pub mod error;
pub mod model;
pub mod parser;
pub mod quiz;
pub mod schema;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;
