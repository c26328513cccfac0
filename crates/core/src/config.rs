use crate::types::Addon;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_WIZARD__` and an optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fees: FeePolicy,
    #[serde(default)]
    pub allocation: AllocationPolicy,
    #[serde(default)]
    pub timeline: TimelinePolicy,
    #[serde(default)]
    pub conflicts: ConflictPolicy,
}

// ─── Fee Policy ─────────────────────────────────────────────────────────────

/// One step of the variable fee schedule. A tier applies to effective ad
/// investment at or above `from` until the next tier starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    pub from: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeePolicy {
    #[serde(default = "default_minimum_investment")]
    pub minimum_investment: Decimal,
    #[serde(default = "default_first_platform_fee")]
    pub first_platform_fee: Decimal,
    #[serde(default = "default_additional_platform_fee")]
    pub additional_platform_fee: Decimal,
    /// Ascending by `from`; the first tier must start at zero.
    #[serde(default = "default_variable_tiers")]
    pub variable_tiers: Vec<FeeTier>,
    /// At or above this effective investment fixed fees are waived and
    /// `large_investment_rate` replaces the tiered schedule.
    #[serde(default = "default_large_investment_threshold")]
    pub large_investment_threshold: Decimal,
    #[serde(default = "default_large_investment_rate")]
    pub large_investment_rate: Decimal,
    /// Subtracted from the variable rate for a distributor's first release.
    #[serde(default = "default_first_release_rate_discount")]
    pub first_release_rate_discount: Decimal,
    /// Proportion removed from fixed + variable fees once the volume
    /// discount applies.
    #[serde(default = "default_volume_discount_rate")]
    pub volume_discount_rate: Decimal,
    /// 1-based engagement number from which the volume discount applies.
    #[serde(default = "default_volume_discount_from_engagement")]
    pub volume_discount_from_engagement: u32,
    #[serde(default = "default_setup_fee")]
    pub setup_fee: Decimal,
    #[serde(default = "default_addon_costs")]
    pub addon_costs: BTreeMap<Addon, Decimal>,
    #[serde(default = "default_max_inversion_iterations")]
    pub max_inversion_iterations: u32,
}

fn default_minimum_investment() -> Decimal {
    dec!(1000)
}
fn default_first_platform_fee() -> Decimal {
    dec!(250)
}
fn default_additional_platform_fee() -> Decimal {
    dec!(150)
}
fn default_variable_tiers() -> Vec<FeeTier> {
    vec![
        FeeTier {
            from: dec!(0),
            rate: dec!(0.15),
        },
        FeeTier {
            from: dec!(5000),
            rate: dec!(0.12),
        },
        FeeTier {
            from: dec!(15000),
            rate: dec!(0.10),
        },
        FeeTier {
            from: dec!(30000),
            rate: dec!(0.08),
        },
    ]
}
fn default_large_investment_threshold() -> Decimal {
    dec!(50000)
}
fn default_large_investment_rate() -> Decimal {
    dec!(0.05)
}
fn default_first_release_rate_discount() -> Decimal {
    dec!(0.01)
}
fn default_volume_discount_rate() -> Decimal {
    dec!(0.10)
}
fn default_volume_discount_from_engagement() -> u32 {
    3
}
fn default_setup_fee() -> Decimal {
    dec!(500)
}
fn default_addon_costs() -> BTreeMap<Addon, Decimal> {
    BTreeMap::from([
        (Addon::ContentAdaptation, dec!(300)),
        (Addon::CreativeProduction, dec!(1200)),
        (Addon::AudienceResearch, dec!(450)),
        (Addon::InfluencerSeeding, dec!(800)),
        (Addon::PerformanceReport, dec!(250)),
    ])
}
fn default_max_inversion_iterations() -> u32 {
    32
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            minimum_investment: default_minimum_investment(),
            first_platform_fee: default_first_platform_fee(),
            additional_platform_fee: default_additional_platform_fee(),
            variable_tiers: default_variable_tiers(),
            large_investment_threshold: default_large_investment_threshold(),
            large_investment_rate: default_large_investment_rate(),
            first_release_rate_discount: default_first_release_rate_discount(),
            volume_discount_rate: default_volume_discount_rate(),
            volume_discount_from_engagement: default_volume_discount_from_engagement(),
            setup_fee: default_setup_fee(),
            addon_costs: default_addon_costs(),
            max_inversion_iterations: default_max_inversion_iterations(),
        }
    }
}

// ─── Allocation Policy ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationPolicy {
    /// Accepted distance, in percentage points, between the allocation
    /// sum and 100.
    #[serde(default = "default_sum_tolerance")]
    pub sum_tolerance: Decimal,
}

fn default_sum_tolerance() -> Decimal {
    dec!(0.5)
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            sum_tolerance: default_sum_tolerance(),
        }
    }
}

// ─── Timeline Policy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TimelinePolicy {
    #[serde(default = "default_pre_campaign_days")]
    pub pre_campaign_days: u32,
    #[serde(default = "default_creative_lead_business_days")]
    pub creative_lead_business_days: u32,
    /// Extra lead time for creatives when the content adaptation add-on
    /// is selected.
    #[serde(default = "default_content_adaptation_extra_business_days")]
    pub content_adaptation_extra_business_days: u32,
    #[serde(default = "default_final_report_business_days")]
    pub final_report_business_days: u32,
}

fn default_pre_campaign_days() -> u32 {
    14
}
fn default_creative_lead_business_days() -> u32 {
    3
}
fn default_content_adaptation_extra_business_days() -> u32 {
    2
}
fn default_final_report_business_days() -> u32 {
    3
}

impl Default for TimelinePolicy {
    fn default() -> Self {
        Self {
            pre_campaign_days: default_pre_campaign_days(),
            creative_lead_business_days: default_creative_lead_business_days(),
            content_adaptation_extra_business_days: default_content_adaptation_extra_business_days(),
            final_report_business_days: default_final_report_business_days(),
        }
    }
}

// ─── Conflict Policy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictPolicy {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    /// Share of audience keywords two campaigns must have in common to
    /// count as targeting the same audience.
    #[serde(default = "default_audience_overlap_threshold")]
    pub audience_overlap_threshold: f64,
}

fn default_debounce_ms() -> u64 {
    500
}
fn default_lookup_timeout_ms() -> u64 {
    5000
}
fn default_audience_overlap_threshold() -> f64 {
    0.5
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            audience_overlap_threshold: default_audience_overlap_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_WIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
