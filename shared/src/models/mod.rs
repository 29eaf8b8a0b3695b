//! Domain models for the Feedlot Purchase Management Platform

mod enclosure;
mod finance;
mod loss;
mod lot;
mod placement;

pub use enclosure::*;
pub use finance::*;
pub use loss::*;
pub use lot::*;
pub use placement::*;
