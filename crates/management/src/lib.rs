//! Campaign wizard backend: timeline derivation, advisory conflict checks
//! and the configuration reducer that ties the fee and budget engines
//! together.
//!
//! Campaign lookups go through [`CampaignLookup`]; the DashMap directory
//! serves development and tests.

pub mod conflicts;
pub mod directory;
pub mod timeline;
pub mod wizard;

pub use conflicts::{
    classify, CampaignLookup, CheckOutcome, ConflictCriteria, ConflictDetector, ConflictReport,
    ConflictSeverity, ExistingCampaign,
};
pub use directory::InMemoryCampaignDirectory;
pub use timeline::{CampaignTimeline, TimelineDeriver};
pub use wizard::{
    CampaignConfig, CampaignWizard, ConfigAction, DraftSnapshot, StepReport, SubmissionPayload,
    WizardStep,
};
