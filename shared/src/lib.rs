//! Shared types and models for the Feedlot Purchase Management Platform
//!
//! This crate contains the domain entities, enums and pure domain
//! computations shared between the backend and other components of the
//! system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
