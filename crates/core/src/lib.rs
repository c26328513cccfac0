//! Shared types, policy configuration and the error taxonomy for the
//! campaign configuration engine.

pub mod config;
pub mod error;
pub mod money;
pub mod types;

pub use config::AppConfig;
pub use error::{CampaignError, CampaignResult, ValidationError};
pub use types::{Addon, FeeMode, PlanningMode, PlatformId};
