//! Business logic services

pub mod allocation;
pub mod enclosure;
pub mod finance;
pub mod loss;
pub mod lot;

pub use allocation::AllocationService;
pub use enclosure::EnclosureService;
pub use finance::{FinanceDefaults, FinanceService};
pub use loss::LossService;
pub use lot::LotService;
