//! Advertising fee engine: fixed platform fees, tiered variable fees,
//! setup fee and add-on costs under the integrated and additional fee modes.

use campaign_core::config::FeePolicy;
use campaign_core::money::{round_money, MAX_AMOUNT};
use campaign_core::{Addon, CampaignError, CampaignResult, FeeMode, PlatformId, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

// ─── Types ─────────────────────────────────────────────────────────────────

/// Everything the fee engine needs from the wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeInput {
    pub platforms: Vec<PlatformId>,
    pub total_investment: Decimal,
    pub fee_mode: FeeMode,
    pub is_first_release: bool,
    pub selected_addons: BTreeSet<Addon>,
    /// Campaigns the distributor already ran with us.
    #[serde(default)]
    pub prior_engagements: u32,
}

/// Base cost charged for one selected add-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonCharge {
    pub addon: Addon,
    pub amount: Decimal,
}

/// Itemized cost summary. All amounts are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub fee_mode: FeeMode,
    /// The investment figure the user entered.
    pub ad_investment: Decimal,
    /// What actually reaches the advertising platforms.
    pub effective_ad_investment: Decimal,
    pub fixed_fee: Decimal,
    pub variable_fee: Decimal,
    pub setup_fee: Decimal,
    pub addons_base_cost: Decimal,
    pub addon_charges: Vec<AddonCharge>,
    pub total_estimated: Decimal,
    pub volume_discount_applied: bool,
}

/// A single row of the on-screen cost summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLineItem {
    pub description: String,
    pub amount: Decimal,
}

impl FeeBreakdown {
    /// Platform, management, setup and add-on fees combined.
    pub fn total_fees(&self) -> Decimal {
        self.fixed_fee + self.variable_fee + self.setup_fee + self.addons_base_cost
    }

    /// Rows for the cost summary card. Zero-valued fees are omitted.
    pub fn line_items(&self) -> Vec<FeeLineItem> {
        let mut items = vec![FeeLineItem {
            description: "Effective ad investment".to_string(),
            amount: self.effective_ad_investment,
        }];
        let fees = [
            ("Platform fees", self.fixed_fee),
            ("Management fee", self.variable_fee),
            ("Setup fee (first release)", self.setup_fee),
        ];
        for (description, amount) in fees {
            if !amount.is_zero() {
                items.push(FeeLineItem {
                    description: description.to_string(),
                    amount,
                });
            }
        }
        for charge in &self.addon_charges {
            items.push(FeeLineItem {
                description: format!("Add-on: {}", charge.addon),
                amount: charge.amount,
            });
        }
        items
    }
}

/// Which part of the variable fee schedule an investment falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RateBand {
    Tier(usize),
    Large,
}

/// Fee parameters for one band, after first-release and volume discounts.
#[derive(Debug, Clone, Copy)]
struct BandSchedule {
    fixed: Decimal,
    rate: Decimal,
    multiplier: Decimal,
}

impl BandSchedule {
    fn fixed_fee(&self) -> Decimal {
        self.fixed * self.multiplier
    }

    fn variable_fee(&self, effective: Decimal) -> Decimal {
        self.rate * effective * self.multiplier
    }
}

// ─── Calculator ────────────────────────────────────────────────────────────

/// Pure fee calculator parameterised by a [`FeePolicy`].
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    policy: FeePolicy,
}

impl FeeCalculator {
    pub fn new(policy: FeePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    /// Compute the fee breakdown for a configuration.
    pub fn calculate(&self, input: &FeeInput) -> CampaignResult<FeeBreakdown> {
        let total = input.total_investment;
        if total < Decimal::ZERO {
            return Err(ValidationError::NegativeInvestment { value: total }.into());
        }
        if total > MAX_AMOUNT {
            return Err(ValidationError::InvestmentTooLarge {
                value: total,
                maximum: MAX_AMOUNT,
            }
            .into());
        }
        if total < self.policy.minimum_investment {
            return Err(ValidationError::InvestmentBelowMinimum {
                investment: total,
                minimum: self.policy.minimum_investment,
            }
            .into());
        }

        let platform_count = input.platforms.iter().collect::<HashSet<_>>().len();
        let volume_discount = self.volume_discount_applies(input.prior_engagements);
        let setup = if input.is_first_release {
            self.policy.setup_fee
        } else {
            Decimal::ZERO
        };

        let (effective, schedule) = match input.fee_mode {
            FeeMode::Additional => {
                let schedule = self.schedule(
                    self.band_of(total),
                    platform_count,
                    input.is_first_release,
                    volume_discount,
                );
                (total, schedule)
            }
            FeeMode::Integrated => self.invert(
                total,
                setup,
                platform_count,
                input.is_first_release,
                volume_discount,
            )?,
        };

        let addon_charges = self.addon_charges(&input.selected_addons)?;
        let addons_base_cost: Decimal = addon_charges.iter().map(|c| c.amount).sum();

        let ad_investment = round_money(total);
        let fixed_fee = round_money(schedule.fixed_fee());
        let variable_fee = round_money(schedule.variable_fee(effective));
        let setup_fee = round_money(setup);

        let (effective_ad_investment, total_estimated) = match input.fee_mode {
            FeeMode::Integrated => (
                ad_investment - fixed_fee - variable_fee - setup_fee,
                ad_investment + addons_base_cost,
            ),
            FeeMode::Additional => (
                ad_investment,
                ad_investment + fixed_fee + variable_fee + setup_fee + addons_base_cost,
            ),
        };

        Ok(FeeBreakdown {
            fee_mode: input.fee_mode,
            ad_investment,
            effective_ad_investment,
            fixed_fee,
            variable_fee,
            setup_fee,
            addons_base_cost,
            addon_charges,
            total_estimated,
            volume_discount_applied: volume_discount,
        })
    }

    /// Solve `e + fixed(e) + variable(e) + setup = total` for the effective
    /// investment `e`.
    ///
    /// Each band has a closed-form solution, so the search starts from the
    /// largest possible `e` and steps down through bands until the solution
    /// lands in the band that produced it. Revisiting a band means the
    /// schedule has no consistent solution for this total.
    fn invert(
        &self,
        total: Decimal,
        setup: Decimal,
        platform_count: usize,
        first_release: bool,
        volume_discount: bool,
    ) -> CampaignResult<(Decimal, BandSchedule)> {
        let mut effective = total - setup;
        let mut visited = HashSet::new();

        for iteration in 1..=self.policy.max_inversion_iterations {
            let band = self.band_of(effective);
            let schedule = self.schedule(band, platform_count, first_release, volume_discount);
            let next = (total - setup - schedule.fixed_fee())
                / (Decimal::ONE + schedule.rate * schedule.multiplier);

            if next < Decimal::ZERO {
                return Err(ValidationError::InvestmentBelowMinimum {
                    investment: total,
                    minimum: round_money(setup + schedule.fixed_fee()),
                }
                .into());
            }

            let next_band = self.band_of(next);
            if next_band == band {
                debug!(
                    iterations = iteration,
                    effective = %next,
                    "Integrated fee inversion converged"
                );
                return Ok((next, schedule));
            }
            if !visited.insert(band) || visited.contains(&next_band) {
                return Err(CampaignError::FeeInversionDiverged {
                    iterations: iteration,
                });
            }
            effective = next;
        }

        Err(CampaignError::FeeInversionDiverged {
            iterations: self.policy.max_inversion_iterations,
        })
    }

    fn band_of(&self, effective: Decimal) -> RateBand {
        if effective >= self.policy.large_investment_threshold {
            return RateBand::Large;
        }
        let index = self
            .policy
            .variable_tiers
            .iter()
            .rposition(|tier| tier.from <= effective)
            .unwrap_or(0);
        RateBand::Tier(index)
    }

    fn schedule(
        &self,
        band: RateBand,
        platform_count: usize,
        first_release: bool,
        volume_discount: bool,
    ) -> BandSchedule {
        let (fixed, base_rate) = match band {
            RateBand::Large => (Decimal::ZERO, self.policy.large_investment_rate),
            RateBand::Tier(index) => (
                self.platform_fees(platform_count),
                self.policy
                    .variable_tiers
                    .get(index)
                    .map(|tier| tier.rate)
                    .unwrap_or(Decimal::ZERO),
            ),
        };
        let rate = if first_release {
            (base_rate - self.policy.first_release_rate_discount).max(Decimal::ZERO)
        } else {
            base_rate
        };
        let multiplier = if volume_discount {
            Decimal::ONE - self.policy.volume_discount_rate
        } else {
            Decimal::ONE
        };
        BandSchedule {
            fixed,
            rate,
            multiplier,
        }
    }

    fn platform_fees(&self, platform_count: usize) -> Decimal {
        match platform_count {
            0 => Decimal::ZERO,
            n => {
                self.policy.first_platform_fee
                    + self.policy.additional_platform_fee * Decimal::from(n - 1)
            }
        }
    }

    fn volume_discount_applies(&self, prior_engagements: u32) -> bool {
        prior_engagements.saturating_add(1) >= self.policy.volume_discount_from_engagement
    }

    fn addon_charges(&self, addons: &BTreeSet<Addon>) -> CampaignResult<Vec<AddonCharge>> {
        addons
            .iter()
            .map(|addon| {
                self.policy
                    .addon_costs
                    .get(addon)
                    .map(|cost| AddonCharge {
                        addon: *addon,
                        amount: round_money(*cost),
                    })
                    .ok_or_else(|| ValidationError::UnpricedAddon(addon.to_string()).into())
            })
            .collect()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::config::FeeTier;
    use rust_decimal_macros::dec;

    fn input(platforms: &[&str], total: Decimal, fee_mode: FeeMode) -> FeeInput {
        FeeInput {
            platforms: platforms.iter().map(|p| PlatformId::from(*p)).collect(),
            total_investment: total,
            fee_mode,
            is_first_release: false,
            selected_addons: BTreeSet::new(),
            prior_engagements: 0,
        }
    }

    // 1. Additional mode ---------------------------------------------------

    #[test]
    fn test_additional_mode_adds_fees_on_top() {
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta", "google_ads"], dec!(10000), FeeMode::Additional))
            .unwrap();

        assert_eq!(fees.fixed_fee, dec!(400));
        assert_eq!(fees.variable_fee, dec!(1200));
        assert_eq!(fees.setup_fee, Decimal::ZERO);
        assert_eq!(fees.effective_ad_investment, dec!(10000));
        assert_eq!(fees.total_estimated, dec!(11600));
    }

    #[test]
    fn test_first_release_setup_fee_and_rate_discount() {
        let calc = FeeCalculator::default();
        let mut req = input(&["meta"], dec!(10000), FeeMode::Additional);
        req.is_first_release = true;

        let fees = calc.calculate(&req).unwrap();
        assert_eq!(fees.fixed_fee, dec!(250));
        assert_eq!(fees.variable_fee, dec!(1100));
        assert_eq!(fees.setup_fee, dec!(500));
        assert_eq!(fees.total_estimated, dec!(11850));
    }

    #[test]
    fn test_volume_discount_from_third_engagement() {
        let calc = FeeCalculator::default();
        let mut req = input(&["meta", "google_ads"], dec!(10000), FeeMode::Additional);

        req.prior_engagements = 1;
        let second = calc.calculate(&req).unwrap();
        assert!(!second.volume_discount_applied);
        assert_eq!(second.fixed_fee + second.variable_fee, dec!(1600));

        req.prior_engagements = 2;
        let third = calc.calculate(&req).unwrap();
        assert!(third.volume_discount_applied);
        assert_eq!(third.fixed_fee, dec!(360));
        assert_eq!(third.variable_fee, dec!(1080));
        assert_eq!(third.total_estimated, dec!(11440));
    }

    #[test]
    fn test_large_investment_waives_fixed_fees() {
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta", "google_ads", "tiktok"], dec!(60000), FeeMode::Additional))
            .unwrap();

        assert_eq!(fees.fixed_fee, Decimal::ZERO);
        assert_eq!(fees.variable_fee, dec!(3000));
        assert_eq!(fees.total_estimated, dec!(63000));
    }

    #[test]
    fn test_duplicate_platforms_charged_once() {
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta", "meta"], dec!(10000), FeeMode::Additional))
            .unwrap();
        assert_eq!(fees.fixed_fee, dec!(250));
    }

    // 2. Integrated mode ---------------------------------------------------

    #[test]
    fn test_integrated_mode_carves_fees_out() {
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta", "google_ads"], dec!(10000), FeeMode::Integrated))
            .unwrap();

        assert_eq!(fees.fixed_fee, dec!(400));
        assert_eq!(fees.variable_fee, dec!(1028.57));
        assert_eq!(fees.effective_ad_investment, dec!(8571.43));
        assert_eq!(fees.total_estimated, dec!(10000));
        assert_eq!(
            fees.effective_ad_investment + fees.fixed_fee + fees.variable_fee + fees.setup_fee,
            fees.ad_investment
        );
    }

    #[test]
    fn test_integrated_mode_steps_down_a_tier() {
        // 5 500 gross lands below the 5 000 tier once fees are removed.
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta"], dec!(5500), FeeMode::Integrated))
            .unwrap();

        assert_eq!(fees.fixed_fee, dec!(250));
        assert_eq!(fees.variable_fee, dec!(684.78));
        assert_eq!(fees.effective_ad_investment, dec!(4565.22));
    }

    #[test]
    fn test_integrated_mode_large_investment() {
        let calc = FeeCalculator::default();
        let fees = calc
            .calculate(&input(&["meta"], dec!(53000), FeeMode::Integrated))
            .unwrap();

        assert_eq!(fees.fixed_fee, Decimal::ZERO);
        assert_eq!(fees.variable_fee, dec!(2523.81));
        assert_eq!(fees.effective_ad_investment, dec!(50476.19));
    }

    #[test]
    fn test_integrated_below_break_even_is_validation_error() {
        let calc = FeeCalculator::default();
        let mut req = input(&["meta", "google_ads", "tiktok"], dec!(1000), FeeMode::Integrated);
        req.is_first_release = true;

        match calc.calculate(&req) {
            Err(CampaignError::Validation(ValidationError::InvestmentBelowMinimum {
                minimum, ..
            })) => assert_eq!(minimum, dec!(1050)),
            other => panic!("expected InvestmentBelowMinimum, got {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_schedule_reports_divergence() {
        let policy = FeePolicy {
            variable_tiers: vec![
                FeeTier { from: dec!(0), rate: dec!(0.05) },
                FeeTier { from: dec!(5000), rate: dec!(0.50) },
            ],
            large_investment_threshold: dec!(1000000000),
            ..FeePolicy::default()
        };
        let calc = FeeCalculator::new(policy);

        let result = calc.calculate(&input(&["meta"], dec!(6000), FeeMode::Integrated));
        assert!(matches!(result, Err(CampaignError::FeeInversionDiverged { .. })));
    }

    // 3. Mode consistency --------------------------------------------------

    #[test]
    fn test_fee_mode_consistency_across_investments() {
        let calc = FeeCalculator::default();
        for total in [dec!(1000), dec!(4999.99), dec!(7250), dec!(15000), dec!(31234.56), dec!(52000), dec!(250000)] {
            let mut req = input(&["meta", "youtube"], total, FeeMode::Additional);
            req.selected_addons = BTreeSet::from([Addon::AudienceResearch]);

            let additional = calc.calculate(&req).unwrap();
            assert!(additional.total_estimated >= total);
            assert_eq!(
                additional.total_estimated,
                additional.effective_ad_investment + additional.total_fees()
            );

            req.fee_mode = FeeMode::Integrated;
            let integrated = calc.calculate(&req).unwrap();
            assert_eq!(integrated.total_estimated, total + integrated.addons_base_cost);
            assert_eq!(
                integrated.effective_ad_investment,
                total - integrated.fixed_fee - integrated.variable_fee - integrated.setup_fee
            );
        }
    }

    // 4. Add-ons and validation --------------------------------------------

    #[test]
    fn test_addons_independent_of_fee_mode() {
        let calc = FeeCalculator::default();
        let mut req = input(&["meta"], dec!(20000), FeeMode::Integrated);
        req.selected_addons = BTreeSet::from([Addon::ContentAdaptation, Addon::PerformanceReport]);

        let integrated = calc.calculate(&req).unwrap();
        req.fee_mode = FeeMode::Additional;
        let additional = calc.calculate(&req).unwrap();

        assert_eq!(integrated.addons_base_cost, dec!(550));
        assert_eq!(additional.addons_base_cost, dec!(550));
        assert_eq!(integrated.addon_charges.len(), 2);
    }

    #[test]
    fn test_unpriced_addon_rejected() {
        let mut policy = FeePolicy::default();
        policy.addon_costs.remove(&Addon::InfluencerSeeding);
        let calc = FeeCalculator::new(policy);
        let mut req = input(&["meta"], dec!(20000), FeeMode::Additional);
        req.selected_addons = BTreeSet::from([Addon::InfluencerSeeding]);

        match calc.calculate(&req) {
            Err(CampaignError::Validation(err)) => assert_eq!(err.field(), "addons"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_investment_below_minimum() {
        let calc = FeeCalculator::default();
        match calc.calculate(&input(&["meta"], dec!(999.99), FeeMode::Additional)) {
            Err(CampaignError::Validation(err)) => assert_eq!(err.field(), "total_investment"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(
            calc.calculate(&input(&["meta"], dec!(-5), FeeMode::Additional)),
            Err(CampaignError::Validation(ValidationError::NegativeInvestment { .. }))
        ));
    }

    #[test]
    fn test_oversized_investment_is_validation_error() {
        let calc = FeeCalculator::default();
        for mode in [FeeMode::Additional, FeeMode::Integrated] {
            let result = calc.calculate(&input(&["meta", "tiktok"], Decimal::MAX, mode));
            match result {
                Err(CampaignError::Validation(e)) => assert_eq!(e.field(), "total_investment"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert!(calc
            .calculate(&input(&["meta"], MAX_AMOUNT, FeeMode::Integrated))
            .is_ok());
    }

    #[test]
    fn test_line_items_skip_zero_fees() {
        let calc = FeeCalculator::default();
        let mut req = input(&["meta"], dec!(60000), FeeMode::Additional);
        req.selected_addons = BTreeSet::from([Addon::CreativeProduction]);
        let fees = calc.calculate(&req).unwrap();

        let items = fees.line_items();
        let descriptions: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Effective ad investment", "Management fee", "Add-on: creative_production"]
        );
    }
}
