use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fee inversion did not converge after {iterations} iterations")]
    FeeInversionDiverged { iterations: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Campaign lookup error: {0}")]
    Collaborator(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User-correctable input problems. Every variant names the form field it
/// belongs to so the wizard can render the message inline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Percentage for {platform} must be between 0 and 100 (got {value})")]
    PercentageOutOfRange { platform: String, value: Decimal },

    #[error("Amount for {platform} cannot be negative (got {value})")]
    NegativeAmount { platform: String, value: Decimal },

    #[error("Total investment cannot be negative (got {value})")]
    NegativeInvestment { value: Decimal },

    #[error("Total investment {value} exceeds the maximum of {maximum}")]
    InvestmentTooLarge { value: Decimal, maximum: Decimal },

    #[error("Amount for {platform} exceeds the maximum of {maximum} (got {value})")]
    AmountTooLarge {
        platform: String,
        value: Decimal,
        maximum: Decimal,
    },

    #[error("Total investment {investment} is below the minimum of {minimum}")]
    InvestmentBelowMinimum { investment: Decimal, minimum: Decimal },

    #[error("Campaign end date {end} must be after the premiere weekend end {premiere_end}")]
    EndDateNotAfterPremiere { end: NaiveDate, premiere_end: NaiveDate },

    #[error("Platform percentages add up to {sum}%, expected 100% (±{tolerance})")]
    AllocationSumOutOfTolerance { sum: Decimal, tolerance: Decimal },

    #[error("Platform {0} is not part of this campaign")]
    UnknownPlatform(String),

    #[error("Platform {0} is already selected")]
    DuplicatePlatform(String),

    #[error("At least one platform must be selected")]
    NoPlatforms,

    #[error("Release date is required")]
    MissingReleaseDate,

    #[error("Add-on {0} has no configured base cost")]
    UnpricedAddon(String),

    #[error("{field}: '{raw}' is not a valid number")]
    InvalidNumber { field: String, raw: String },

    #[error("Unsupported draft snapshot version {0}")]
    UnsupportedSnapshot(u32),
}

impl ValidationError {
    /// Name of the wizard form field the error is attributed to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::PercentageOutOfRange { .. } => "budget_percent",
            ValidationError::NegativeAmount { .. } | ValidationError::AmountTooLarge { .. } => {
                "budget_amount"
            }
            ValidationError::NegativeInvestment { .. }
            | ValidationError::InvestmentTooLarge { .. }
            | ValidationError::InvestmentBelowMinimum { .. } => "total_investment",
            ValidationError::EndDateNotAfterPremiere { .. } => "campaign_end_date",
            ValidationError::AllocationSumOutOfTolerance { .. } => "allocation",
            ValidationError::UnknownPlatform(_)
            | ValidationError::DuplicatePlatform(_)
            | ValidationError::NoPlatforms => "platforms",
            ValidationError::MissingReleaseDate => "release_date",
            ValidationError::UnpricedAddon(_) => "addons",
            ValidationError::InvalidNumber { field, .. } => field,
            ValidationError::UnsupportedSnapshot(_) => "draft",
        }
    }
}
