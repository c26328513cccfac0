//! Budget allocation across advertising platforms.

pub mod allocation;

pub use allocation::{BudgetAllocator, PersistedAllocation, PlatformAllocation};
