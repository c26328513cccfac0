//! Per-platform budget split that stays consistent with the total
//! investment whichever side (percentages or amounts) the user edits.

use campaign_core::money::{round_money, MAX_AMOUNT, MONEY_DP, ONE_HUNDRED};
use campaign_core::{PlanningMode, PlatformId, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Types ─────────────────────────────────────────────────────────────────

/// Share of the budget assigned to one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAllocation {
    pub platform: PlatformId,
    /// Full precision; rounded only when persisted.
    pub percentage: Decimal,
    pub amount: Decimal,
}

impl PlatformAllocation {
    fn empty(platform: PlatformId) -> Self {
        Self {
            platform,
            percentage: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }
}

/// Row stored with the submitted campaign. Amounts are a UI-only view and
/// are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAllocation {
    pub platform_name: String,
    pub budget_percent: Decimal,
}

// ─── BudgetAllocator ───────────────────────────────────────────────────────

/// Reconciles platform percentages, platform amounts and the total
/// investment.
///
/// Platforms keep their insertion order. Percentage edits never touch
/// other platforms; amount edits move the total. Switching to equal split
/// parks the manual allocation so switching back restores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocator {
    mode: PlanningMode,
    total_investment: Decimal,
    entries: Vec<PlatformAllocation>,
    #[serde(default)]
    parked_manual: Option<Vec<PlatformAllocation>>,
}

impl BudgetAllocator {
    /// Create an empty equal-split allocator for the given total.
    pub fn new(total_investment: Decimal) -> Result<Self, ValidationError> {
        let mut allocator = Self::default();
        allocator.set_total_investment(total_investment)?;
        Ok(allocator)
    }

    pub fn mode(&self) -> PlanningMode {
        self.mode
    }

    pub fn total_investment(&self) -> Decimal {
        self.total_investment
    }

    pub fn entries(&self) -> &[PlatformAllocation] {
        &self.entries
    }

    pub fn platforms(&self) -> impl Iterator<Item = &PlatformId> {
        self.entries.iter().map(|e| &e.platform)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, platform: &PlatformId) -> Option<&PlatformAllocation> {
        self.entries.iter().find(|e| &e.platform == platform)
    }

    /// Running percentage total shown next to the allocation table.
    pub fn percentage_sum(&self) -> Decimal {
        self.entries.iter().map(|e| e.percentage).sum()
    }

    pub fn amount_sum(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }

    // ── edits ──

    /// Set one platform's percentage. Other platforms are left alone; the
    /// running sum is checked by [`BudgetAllocator::validate`].
    pub fn set_percentage(
        &mut self,
        platform: &PlatformId,
        value: Decimal,
    ) -> Result<(), ValidationError> {
        if value < Decimal::ZERO || value > ONE_HUNDRED {
            return Err(ValidationError::PercentageOutOfRange {
                platform: platform.to_string(),
                value,
            });
        }
        let total = self.total_investment;
        let entry = self.entry_mut(platform)?;
        entry.percentage = value;
        entry.amount = amount_of(total, value);

        self.enter_manual(PlanningMode::PercentageDriven);
        Ok(())
    }

    /// Set one platform's amount. The total becomes the sum of all amounts
    /// and every percentage is derived from it.
    pub fn set_amount(&mut self, platform: &PlatformId, value: Decimal) -> Result<(), ValidationError> {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                platform: platform.to_string(),
                value,
            });
        }
        if value > MAX_AMOUNT {
            return Err(ValidationError::AmountTooLarge {
                platform: platform.to_string(),
                value,
                maximum: MAX_AMOUNT,
            });
        }
        let others: Decimal = self
            .entries
            .iter()
            .filter(|e| &e.platform != platform)
            .map(|e| e.amount)
            .sum();
        if others + value > MAX_AMOUNT {
            return Err(ValidationError::InvestmentTooLarge {
                value: others + value,
                maximum: MAX_AMOUNT,
            });
        }
        self.entry_mut(platform)?.amount = value;

        self.enter_manual(PlanningMode::AmountDriven);
        self.track_amounts();
        Ok(())
    }

    /// Change the total investment; amounts follow the current percentages.
    pub fn set_total_investment(&mut self, value: Decimal) -> Result<(), ValidationError> {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeInvestment { value });
        }
        if value > MAX_AMOUNT {
            return Err(ValidationError::InvestmentTooLarge {
                value,
                maximum: MAX_AMOUNT,
            });
        }
        self.total_investment = value;
        self.refresh_amounts();
        Ok(())
    }

    pub fn add_platform(&mut self, platform: PlatformId) -> Result<(), ValidationError> {
        if self.get(&platform).is_some() {
            return Err(ValidationError::DuplicatePlatform(platform.to_string()));
        }
        self.entries.push(PlatformAllocation::empty(platform));
        if self.mode == PlanningMode::EqualSplit {
            self.split_equally();
        }
        Ok(())
    }

    pub fn remove_platform(&mut self, platform: &PlatformId) -> Result<(), ValidationError> {
        let index = self
            .entries
            .iter()
            .position(|e| &e.platform == platform)
            .ok_or_else(|| ValidationError::UnknownPlatform(platform.to_string()))?;
        self.entries.remove(index);
        if let Some(parked) = self.parked_manual.as_mut() {
            parked.retain(|e| &e.platform != platform);
        }

        match self.mode {
            PlanningMode::EqualSplit => self.split_equally(),
            PlanningMode::AmountDriven => self.track_amounts(),
            PlanningMode::PercentageDriven => {}
        }
        Ok(())
    }

    /// Switch planning mode without losing manual values.
    pub fn set_planning_mode(&mut self, mode: PlanningMode) {
        if mode == self.mode {
            return;
        }
        match (self.mode, mode) {
            (previous, PlanningMode::EqualSplit) if previous.is_manual() => {
                self.parked_manual = Some(self.entries.clone());
                self.mode = PlanningMode::EqualSplit;
                self.split_equally();
            }
            (PlanningMode::EqualSplit, manual) => {
                if let Some(parked) = self.parked_manual.take() {
                    self.restore_parked(parked);
                }
                self.mode = manual;
                match manual {
                    PlanningMode::AmountDriven => self.track_amounts(),
                    _ => self.refresh_amounts(),
                }
            }
            // Percentage-driven and amount-driven share the same values.
            (_, manual) => self.mode = manual,
        }
    }

    /// Rescale percentages so they add up to exactly 100. An allocation with
    /// nothing assigned falls back to an equal split.
    pub fn normalize(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let sum = self.percentage_sum();
        if sum.is_zero() {
            self.split_equally();
            return;
        }
        let last = self.entries.len() - 1;
        let mut assigned = Decimal::ZERO;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.percentage = if index == last {
                ONE_HUNDRED - assigned
            } else {
                entry.percentage * ONE_HUNDRED / sum
            };
            assigned += entry.percentage;
        }
        self.refresh_amounts();
    }

    // ── validation / output ──

    /// The split must add up to 100 within `tolerance` points whenever there
    /// is something to split.
    pub fn validate(&self, tolerance: Decimal) -> Result<(), ValidationError> {
        if self.entries.is_empty() || self.total_investment <= Decimal::ZERO {
            return Ok(());
        }
        let sum = self.percentage_sum();
        if (sum - ONE_HUNDRED).abs() < tolerance {
            Ok(())
        } else {
            Err(ValidationError::AllocationSumOutOfTolerance {
                sum: sum.round_dp(MONEY_DP),
                tolerance,
            })
        }
    }

    /// Rows for persistence, rounded to two places. The split is normalized
    /// first and the last row absorbs the rounding remainder, so the rows
    /// always add up to exactly 100.
    pub fn persisted(&self) -> Vec<PersistedAllocation> {
        let mut normalized = self.clone();
        normalized.normalize();
        let last = normalized.entries.len().saturating_sub(1);
        let mut assigned = Decimal::ZERO;
        normalized
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let budget_percent = if index == last {
                    ONE_HUNDRED - assigned
                } else {
                    round_money(entry.percentage)
                };
                assigned += budget_percent;
                PersistedAllocation {
                    platform_name: entry.platform.to_string(),
                    budget_percent,
                }
            })
            .collect()
    }

    /// Re-check invariants on an allocator that came from outside, such as a
    /// restored draft.
    pub fn check_integrity(&self) -> Result<(), ValidationError> {
        if self.total_investment < Decimal::ZERO {
            return Err(ValidationError::NegativeInvestment {
                value: self.total_investment,
            });
        }
        if self.total_investment > MAX_AMOUNT {
            return Err(ValidationError::InvestmentTooLarge {
                value: self.total_investment,
                maximum: MAX_AMOUNT,
            });
        }
        let parked = self.parked_manual.iter().flatten();
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if !seen.insert(&entry.platform) {
                return Err(ValidationError::DuplicatePlatform(entry.platform.to_string()));
            }
        }
        for entry in self.entries.iter().chain(parked) {
            if entry.percentage < Decimal::ZERO || entry.percentage > ONE_HUNDRED {
                return Err(ValidationError::PercentageOutOfRange {
                    platform: entry.platform.to_string(),
                    value: entry.percentage,
                });
            }
            if entry.amount < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount {
                    platform: entry.platform.to_string(),
                    value: entry.amount,
                });
            }
            if entry.amount > MAX_AMOUNT {
                return Err(ValidationError::AmountTooLarge {
                    platform: entry.platform.to_string(),
                    value: entry.amount,
                    maximum: MAX_AMOUNT,
                });
            }
        }
        Ok(())
    }

    // ── internal helpers ──

    fn entry_mut(&mut self, platform: &PlatformId) -> Result<&mut PlatformAllocation, ValidationError> {
        self.entries
            .iter_mut()
            .find(|e| &e.platform == platform)
            .ok_or_else(|| ValidationError::UnknownPlatform(platform.to_string()))
    }

    /// A direct edit means the user is now driving the allocation by hand.
    fn enter_manual(&mut self, mode: PlanningMode) {
        if self.mode == PlanningMode::EqualSplit {
            self.parked_manual = None;
        }
        self.mode = mode;
    }

    fn split_equally(&mut self) {
        let count = self.entries.len();
        if count == 0 {
            return;
        }
        let share = ONE_HUNDRED / Decimal::from(count);
        let remainder = ONE_HUNDRED - share * Decimal::from(count - 1);
        let total = self.total_investment;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.percentage = if index == count - 1 { remainder } else { share };
            entry.amount = amount_of(total, entry.percentage);
        }
    }

    fn refresh_amounts(&mut self) {
        let total = self.total_investment;
        for entry in &mut self.entries {
            entry.amount = amount_of(total, entry.percentage);
        }
    }

    /// Amount-driven bookkeeping: total follows amounts, percentages follow
    /// the total.
    fn track_amounts(&mut self) {
        self.total_investment = self.amount_sum();
        let total = self.total_investment;
        for entry in &mut self.entries {
            entry.percentage = if total.is_zero() {
                Decimal::ZERO
            } else {
                entry.amount / total * ONE_HUNDRED
            };
        }
    }

    fn restore_parked(&mut self, parked: Vec<PlatformAllocation>) {
        for entry in &mut self.entries {
            *entry = parked
                .iter()
                .find(|p| p.platform == entry.platform)
                .cloned()
                .unwrap_or_else(|| PlatformAllocation::empty(entry.platform.clone()));
        }
    }
}

fn amount_of(total: Decimal, percentage: Decimal) -> Decimal {
    round_money(total * percentage / ONE_HUNDRED)
}

// ─── Tests ─────────────────────────────────────────────────────────────────
