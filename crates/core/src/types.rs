use serde::{Deserialize, Serialize};
use std::fmt;

/// Advertising platform identifier as selected in the wizard
/// (e.g. `"meta"`, `"google_ads"`, `"tiktok"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlatformId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Optional paid services a distributor can add to a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addon {
    /// Re-cut of trailers and key art for each platform's formats.
    ContentAdaptation,
    CreativeProduction,
    AudienceResearch,
    InfluencerSeeding,
    PerformanceReport,
}

impl Addon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Addon::ContentAdaptation => "content_adaptation",
            Addon::CreativeProduction => "creative_production",
            Addon::AudienceResearch => "audience_research",
            Addon::InfluencerSeeding => "influencer_seeding",
            Addon::PerformanceReport => "performance_report",
        }
    }
}

impl fmt::Display for Addon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How platform and management fees relate to the distributor's budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeMode {
    /// Fees are carved out of the total investment.
    #[default]
    Integrated,
    /// Fees are charged on top of the total investment.
    Additional,
}

/// Which side of the allocation the user is driving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    #[default]
    EqualSplit,
    PercentageDriven,
    AmountDriven,
}

impl PlanningMode {
    pub fn is_manual(&self) -> bool {
        !matches!(self, PlanningMode::EqualSplit)
    }
}
