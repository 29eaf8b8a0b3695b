//! HTTP request handlers

pub mod enclosure;
pub mod health;
pub mod loss;
pub mod lot;

pub use enclosure::*;
pub use health::*;
pub use loss::*;
pub use lot::*;
