//! Campaign configuration wizard: a reducer over [`CampaignConfig`],
//! per-step gating, the submission payload and draft snapshots.
//!
//! Every edit goes through [`CampaignWizard::apply`], which returns a new
//! configuration or a field-attributed error. A rejected edit leaves the
//! previous configuration untouched.

use crate::conflicts::{ConflictCriteria, ConflictReport, ConflictSeverity};
use crate::timeline::{premiere_weekend, CampaignTimeline, TimelineDeriver};
use campaign_billing::{FeeBreakdown, FeeCalculator, FeeInput};
use campaign_budget::{BudgetAllocator, PersistedAllocation};
use campaign_core::config::AllocationPolicy;
use campaign_core::money::{parse_money, parse_percentage};
use campaign_core::{
    Addon, AppConfig, CampaignError, CampaignResult, FeeMode, PlanningMode, PlatformId,
    ValidationError,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// Current [`DraftSnapshot`] layout.
pub const SNAPSHOT_VERSION: u32 = 1;

// ─── Configuration State ────────────────────────────────────────────────────

/// Everything the user has entered so far. Derived values (fees, timeline,
/// conflict criteria) are recomputed on demand and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub target_audience: String,
    pub territory: String,
    release_date: Option<NaiveDate>,
    manual_end_date: Option<NaiveDate>,
    fee_mode: FeeMode,
    is_first_release: bool,
    #[serde(default)]
    prior_engagements: u32,
    selected_addons: BTreeSet<Addon>,
    allocation: BudgetAllocator,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            genre: String::new(),
            target_audience: String::new(),
            territory: String::new(),
            release_date: None,
            manual_end_date: None,
            fee_mode: FeeMode::default(),
            is_first_release: false,
            prior_engagements: 0,
            selected_addons: BTreeSet::new(),
            allocation: BudgetAllocator::default(),
        }
    }
}

impl CampaignConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        self.release_date
    }

    pub fn manual_end_date(&self) -> Option<NaiveDate> {
        self.manual_end_date
    }

    pub fn fee_mode(&self) -> FeeMode {
        self.fee_mode
    }

    pub fn is_first_release(&self) -> bool {
        self.is_first_release
    }

    pub fn prior_engagements(&self) -> u32 {
        self.prior_engagements
    }

    pub fn selected_addons(&self) -> &BTreeSet<Addon> {
        &self.selected_addons
    }

    pub fn allocation(&self) -> &BudgetAllocator {
        &self.allocation
    }

    pub fn total_investment(&self) -> Decimal {
        self.allocation.total_investment()
    }

    pub fn platforms(&self) -> Vec<PlatformId> {
        self.allocation.platforms().cloned().collect()
    }

    pub fn has_content_adaptation(&self) -> bool {
        self.selected_addons.contains(&Addon::ContentAdaptation)
    }

    /// Input for the fee engine.
    pub fn fee_input(&self) -> FeeInput {
        FeeInput {
            platforms: self.platforms(),
            total_investment: self.total_investment(),
            fee_mode: self.fee_mode,
            is_first_release: self.is_first_release,
            selected_addons: self.selected_addons.clone(),
            prior_engagements: self.prior_engagements,
        }
    }

    /// Criteria for the conflict check, once the release date, genre and
    /// territory are known.
    pub fn conflict_criteria(&self) -> Option<ConflictCriteria> {
        let release = self.release_date?;
        if self.genre.trim().is_empty() || self.territory.trim().is_empty() {
            return None;
        }
        let (premiere_start, premiere_end) = premiere_weekend(release);
        Some(ConflictCriteria {
            genre: self.genre.clone(),
            target_audience: self.target_audience.clone(),
            territory: self.territory.clone(),
            premiere_start,
            premiere_end,
            platforms: self.platforms(),
        })
    }
}

/// One user edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ConfigAction {
    SetDetails {
        title: String,
        genre: String,
        target_audience: String,
        territory: String,
    },
    AddPlatform(PlatformId),
    RemovePlatform(PlatformId),
    SetPercentage { platform: PlatformId, value: Decimal },
    SetAmount { platform: PlatformId, value: Decimal },
    SetTotalInvestment(Decimal),
    SetPlanningMode(PlanningMode),
    NormalizeAllocation,
    SetFeeMode(FeeMode),
    SetFirstRelease(bool),
    SetPriorEngagements(u32),
    ToggleAddon(Addon),
    SetReleaseDate(NaiveDate),
    /// `None` clears the override and restores the default end date.
    SetManualEndDate(Option<NaiveDate>),
}

impl ConfigAction {
    /// Percentage edit from a raw form value.
    pub fn percentage_input(platform: PlatformId, raw: &str) -> Result<Self, ValidationError> {
        let value = parse_percentage("budget_percent", raw)?;
        Ok(ConfigAction::SetPercentage { platform, value })
    }

    /// Amount edit from a raw form value.
    pub fn amount_input(platform: PlatformId, raw: &str) -> Result<Self, ValidationError> {
        let value = parse_money("budget_amount", raw)?;
        Ok(ConfigAction::SetAmount { platform, value })
    }

    /// Total investment edit from a raw form value.
    pub fn investment_input(raw: &str) -> Result<Self, ValidationError> {
        Ok(ConfigAction::SetTotalInvestment(parse_money("total_investment", raw)?))
    }
}

// ─── Step Gating ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Platforms,
    Budget,
    Schedule,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Platforms,
        WizardStep::Budget,
        WizardStep::Schedule,
        WizardStep::Review,
    ];
}

/// A single problem shown on a step. Blocking issues disable "Next".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepIssue {
    pub field: String,
    pub message: String,
    pub blocking: bool,
}

impl StepIssue {
    fn from_error(error: &ValidationError) -> Self {
        Self {
            field: error.field().to_string(),
            message: error.to_string(),
            blocking: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: WizardStep,
    pub issues: Vec<StepIssue>,
    pub conflict_severity: ConflictSeverity,
    pub can_proceed: bool,
}

impl StepReport {
    pub fn blocking_issues(&self) -> impl Iterator<Item = &StepIssue> {
        self.issues.iter().filter(|i| i.blocking)
    }
}

// ─── Submission & Drafts ────────────────────────────────────────────────────

/// What gets stored when the user submits the campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub campaign_id: Uuid,
    pub title: String,
    pub genre: String,
    pub target_audience: String,
    pub territory: String,
    pub fee_mode: FeeMode,
    pub is_first_release: bool,
    pub ad_investment: Decimal,
    pub effective_ad_investment: Decimal,
    pub fixed_fee: Decimal,
    pub variable_fee: Decimal,
    pub setup_fee: Decimal,
    pub addons_base_cost: Decimal,
    pub total_estimated_amount: Decimal,
    pub addons: Vec<Addon>,
    pub release_date: NaiveDate,
    pub pre_campaign_start: NaiveDate,
    pub pre_campaign_end: NaiveDate,
    pub premiere_weekend_start: NaiveDate,
    pub premiere_weekend_end: NaiveDate,
    pub creatives_deadline: NaiveDate,
    pub campaign_end_date: NaiveDate,
    pub final_report_date: NaiveDate,
    pub platforms: Vec<PersistedAllocation>,
}

/// Serialized work in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub config: CampaignConfig,
}

// ─── Wizard Engine ──────────────────────────────────────────────────────────

/// Applies edits and evaluates a [`CampaignConfig`] under one set of
/// policies.
#[derive(Debug, Clone, Default)]
pub struct CampaignWizard {
    fees: FeeCalculator,
    timeline: TimelineDeriver,
    allocation: AllocationPolicy,
}

impl CampaignWizard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            fees: FeeCalculator::new(config.fees.clone()),
            timeline: TimelineDeriver::new(config.timeline.clone()),
            allocation: config.allocation.clone(),
        }
    }

    /// Apply one edit and return the resulting configuration.
    pub fn apply(
        &self,
        state: &CampaignConfig,
        action: ConfigAction,
    ) -> Result<CampaignConfig, ValidationError> {
        let mut next = state.clone();
        match action {
            ConfigAction::SetDetails {
                title,
                genre,
                target_audience,
                territory,
            } => {
                next.title = title;
                next.genre = genre;
                next.target_audience = target_audience;
                next.territory = territory;
            }
            ConfigAction::AddPlatform(platform) => next.allocation.add_platform(platform)?,
            ConfigAction::RemovePlatform(platform) => next.allocation.remove_platform(&platform)?,
            ConfigAction::SetPercentage { platform, value } => {
                next.allocation.set_percentage(&platform, value)?
            }
            ConfigAction::SetAmount { platform, value } => {
                next.allocation.set_amount(&platform, value)?
            }
            ConfigAction::SetTotalInvestment(value) => next.allocation.set_total_investment(value)?,
            ConfigAction::SetPlanningMode(mode) => next.allocation.set_planning_mode(mode),
            ConfigAction::NormalizeAllocation => next.allocation.normalize(),
            ConfigAction::SetFeeMode(mode) => next.fee_mode = mode,
            ConfigAction::SetFirstRelease(first) => next.is_first_release = first,
            ConfigAction::SetPriorEngagements(count) => next.prior_engagements = count,
            ConfigAction::ToggleAddon(addon) => {
                if !next.selected_addons.remove(&addon) {
                    next.selected_addons.insert(addon);
                }
            }
            ConfigAction::SetReleaseDate(date) => {
                next.release_date = Some(date);
                if let Some(end) = next.manual_end_date {
                    if self
                        .timeline
                        .derive(date, next.has_content_adaptation(), Some(end))
                        .is_err()
                    {
                        debug!(%date, %end, "Manual end date no longer valid; reverting to default");
                        next.manual_end_date = None;
                    }
                }
            }
            ConfigAction::SetManualEndDate(None) => next.manual_end_date = None,
            ConfigAction::SetManualEndDate(Some(end)) => {
                let release = next.release_date.ok_or(ValidationError::MissingReleaseDate)?;
                self.timeline
                    .derive(release, next.has_content_adaptation(), Some(end))?;
                next.manual_end_date = Some(end);
            }
        }
        Ok(next)
    }

    /// Apply a sequence of edits, stopping at the first rejected one.
    pub fn apply_all(
        &self,
        state: &CampaignConfig,
        actions: impl IntoIterator<Item = ConfigAction>,
    ) -> Result<CampaignConfig, ValidationError> {
        actions
            .into_iter()
            .try_fold(state.clone(), |current, action| self.apply(&current, action))
    }

    pub fn fees(&self, state: &CampaignConfig) -> CampaignResult<FeeBreakdown> {
        self.fees.calculate(&state.fee_input())
    }

    /// The derived calendar, or `None` until a release date is set.
    pub fn timeline(&self, state: &CampaignConfig) -> Option<Result<CampaignTimeline, ValidationError>> {
        let release = state.release_date?;
        Some(
            self.timeline
                .derive(release, state.has_content_adaptation(), state.manual_end_date),
        )
    }

    /// Everything that keeps the user on `step`. The review step repeats
    /// the checks of every earlier step.
    pub fn step_report(
        &self,
        state: &CampaignConfig,
        step: WizardStep,
        conflicts: Option<&ConflictReport>,
        is_admin: bool,
    ) -> StepReport {
        let mut issues = Vec::new();
        let mut conflict_severity = ConflictSeverity::None;

        if matches!(step, WizardStep::Platforms | WizardStep::Review) {
            issues.extend(self.platform_issues(state));
        }
        if matches!(step, WizardStep::Budget | WizardStep::Review) {
            issues.extend(self.budget_issues(state));
        }
        if matches!(step, WizardStep::Schedule | WizardStep::Review) {
            issues.extend(self.schedule_issues(state));
            if let Some(report) = conflicts {
                conflict_severity = report.severity;
                if report.severity != ConflictSeverity::None {
                    issues.push(StepIssue {
                        field: "conflicts".to_string(),
                        message: format!(
                            "{} overlapping campaign(s) found ({:?} severity)",
                            report.conflicts.len(),
                            report.severity
                        ),
                        blocking: report.blocks_progression(is_admin),
                    });
                }
            }
        }

        let can_proceed = !issues.iter().any(|i| i.blocking);
        StepReport {
            step,
            issues,
            conflict_severity,
            can_proceed,
        }
    }

    /// Build the submission payload from a fully valid configuration.
    pub fn submission(&self, state: &CampaignConfig) -> CampaignResult<SubmissionPayload> {
        if state.allocation.is_empty() {
            return Err(ValidationError::NoPlatforms.into());
        }
        state.allocation.validate(self.allocation.sum_tolerance)?;
        let fees = self.fees(state)?;
        let timeline = self
            .timeline(state)
            .ok_or(ValidationError::MissingReleaseDate)??;

        Ok(SubmissionPayload {
            campaign_id: state.id,
            title: state.title.clone(),
            genre: state.genre.clone(),
            target_audience: state.target_audience.clone(),
            territory: state.territory.clone(),
            fee_mode: fees.fee_mode,
            is_first_release: state.is_first_release,
            ad_investment: fees.ad_investment,
            effective_ad_investment: fees.effective_ad_investment,
            fixed_fee: fees.fixed_fee,
            variable_fee: fees.variable_fee,
            setup_fee: fees.setup_fee,
            addons_base_cost: fees.addons_base_cost,
            total_estimated_amount: fees.total_estimated,
            addons: state.selected_addons.iter().copied().collect(),
            release_date: timeline.release_date,
            pre_campaign_start: timeline.pre_campaign_start,
            pre_campaign_end: timeline.pre_campaign_end,
            premiere_weekend_start: timeline.premiere_weekend_start,
            premiere_weekend_end: timeline.premiere_weekend_end,
            creatives_deadline: timeline.creatives_deadline,
            campaign_end_date: timeline.campaign_end,
            final_report_date: timeline.final_report_date,
            platforms: state.allocation.persisted(),
        })
    }

    pub fn snapshot(&self, state: &CampaignConfig) -> DraftSnapshot {
        DraftSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            config: state.clone(),
        }
    }

    /// Re-check a saved draft before handing it back to the wizard.
    pub fn restore(&self, snapshot: DraftSnapshot) -> Result<CampaignConfig, ValidationError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ValidationError::UnsupportedSnapshot(snapshot.version));
        }
        let config = snapshot.config;
        config.allocation.check_integrity()?;
        if let (Some(release), Some(end)) = (config.release_date, config.manual_end_date) {
            self.timeline
                .derive(release, config.has_content_adaptation(), Some(end))?;
        } else if config.manual_end_date.is_some() {
            return Err(ValidationError::MissingReleaseDate);
        }
        Ok(config)
    }

    pub fn snapshot_json(&self, state: &CampaignConfig) -> CampaignResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot(state))?)
    }

    pub fn restore_json(&self, raw: &str) -> CampaignResult<CampaignConfig> {
        let snapshot: DraftSnapshot = serde_json::from_str(raw)?;
        Ok(self.restore(snapshot)?)
    }

    // ── step checks ──

    fn platform_issues(&self, state: &CampaignConfig) -> Vec<StepIssue> {
        if state.allocation.is_empty() {
            vec![StepIssue::from_error(&ValidationError::NoPlatforms)]
        } else {
            Vec::new()
        }
    }

    fn budget_issues(&self, state: &CampaignConfig) -> Vec<StepIssue> {
        let mut issues = Vec::new();
        if let Err(e) = state.allocation.validate(self.allocation.sum_tolerance) {
            issues.push(StepIssue::from_error(&e));
        }
        match self.fees(state) {
            Ok(_) => {}
            Err(CampaignError::Validation(e)) => issues.push(StepIssue::from_error(&e)),
            Err(e) => issues.push(StepIssue {
                field: "fees".to_string(),
                message: e.to_string(),
                blocking: true,
            }),
        }
        issues
    }

    fn schedule_issues(&self, state: &CampaignConfig) -> Vec<StepIssue> {
        match self.timeline(state) {
            None => vec![StepIssue::from_error(&ValidationError::MissingReleaseDate)],
            Some(Err(e)) => vec![StepIssue::from_error(&e)],
            Some(Ok(_)) => Vec::new(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
