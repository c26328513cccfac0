//! Fee engine for film campaign configuration.
//!
//! Computes fixed platform fees, tiered variable fees, the first-release
//! setup fee and add-on costs, and inverts the schedule when fees are
//! carved out of a fixed budget.

pub mod fees;

pub use fees::{AddonCharge, FeeBreakdown, FeeCalculator, FeeInput, FeeLineItem};
