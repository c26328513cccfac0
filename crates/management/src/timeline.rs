//! Campaign calendar derived from a film's release date.
//!
//! Every milestone is a calendar date with no time component. Deadlines
//! count business days (Monday to Friday) and skip weekends.

use campaign_core::config::TimelinePolicy;
use campaign_core::ValidationError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

// ─── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTimeline {
    pub release_date: NaiveDate,
    pub pre_campaign_start: NaiveDate,
    pub pre_campaign_end: NaiveDate,
    pub premiere_weekend_start: NaiveDate,
    pub premiere_weekend_end: NaiveDate,
    pub creatives_deadline: NaiveDate,
    pub campaign_end: NaiveDate,
    pub final_report_date: NaiveDate,
    /// True when `campaign_end` comes from a manual override.
    pub end_date_overridden: bool,
}

/// The kind of milestone card shown in the schedule step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    CreativesDeadline,
    PreCampaign,
    Release,
    PremiereWeekend,
    CampaignEnd,
    FinalReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl CampaignTimeline {
    /// Milestones ordered by start date.
    pub fn milestones(&self) -> Vec<Milestone> {
        let mut milestones = vec![
            Milestone {
                kind: MilestoneKind::CreativesDeadline,
                start: self.creatives_deadline,
                end: None,
            },
            Milestone {
                kind: MilestoneKind::PreCampaign,
                start: self.pre_campaign_start,
                end: Some(self.pre_campaign_end),
            },
            Milestone {
                kind: MilestoneKind::Release,
                start: self.release_date,
                end: None,
            },
            Milestone {
                kind: MilestoneKind::PremiereWeekend,
                start: self.premiere_weekend_start,
                end: Some(self.premiere_weekend_end),
            },
            Milestone {
                kind: MilestoneKind::CampaignEnd,
                start: self.campaign_end,
                end: None,
            },
            Milestone {
                kind: MilestoneKind::FinalReport,
                start: self.final_report_date,
                end: None,
            },
        ];
        milestones.sort_by_key(|m| m.start);
        milestones
    }
}

// ─── Deriver ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TimelineDeriver {
    policy: TimelinePolicy,
}

impl TimelineDeriver {
    pub fn new(policy: TimelinePolicy) -> Self {
        Self { policy }
    }

    /// Build the full calendar for a release date.
    ///
    /// A manual end date must fall strictly after the premiere weekend;
    /// anything else is rejected and the caller keeps its previous value.
    pub fn derive(
        &self,
        release_date: NaiveDate,
        has_content_adaptation: bool,
        manual_end_date: Option<NaiveDate>,
    ) -> Result<CampaignTimeline, ValidationError> {
        let pre_campaign_start = release_date - Duration::days(i64::from(self.policy.pre_campaign_days));
        let pre_campaign_end = release_date - Duration::days(1);
        let (premiere_weekend_start, premiere_weekend_end) = premiere_weekend(release_date);

        let mut lead = self.policy.creative_lead_business_days;
        if has_content_adaptation {
            lead += self.policy.content_adaptation_extra_business_days;
        }
        let creatives_deadline = subtract_business_days(pre_campaign_start, lead);

        let campaign_end = match manual_end_date {
            Some(end) if end <= premiere_weekend_end => {
                return Err(ValidationError::EndDateNotAfterPremiere {
                    end,
                    premiere_end: premiere_weekend_end,
                });
            }
            Some(end) => end,
            None => premiere_weekend_end,
        };
        let final_report_date =
            add_business_days(campaign_end, self.policy.final_report_business_days);

        Ok(CampaignTimeline {
            release_date,
            pre_campaign_start,
            pre_campaign_end,
            premiere_weekend_start,
            premiere_weekend_end,
            creatives_deadline,
            campaign_end,
            final_report_date,
            end_date_overridden: manual_end_date.is_some(),
        })
    }
}

/// The Friday–Sunday span containing `release_date`, or the next one when
/// the release falls Monday to Thursday.
pub fn premiere_weekend(release_date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = i64::from(release_date.weekday().num_days_from_monday());
    let friday = i64::from(Weekday::Fri.num_days_from_monday());
    let start = release_date + Duration::days(friday - weekday);
    (start, start + Duration::days(2))
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn subtract_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    step_business_days(date, days, -1)
}

pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    step_business_days(date, days, 1)
}

fn step_business_days(mut date: NaiveDate, days: u32, direction: i64) -> NaiveDate {
    let mut remaining = days;
    while remaining > 0 {
        date += Duration::days(direction);
        if is_business_day(date) {
            remaining -= 1;
        }
    }
    date
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // 1. Wednesday release ---------------------------------------------------

    #[test]
    fn test_wednesday_release_timeline() {
        let release = date("2025-03-12");
        assert_eq!(release.weekday(), Weekday::Wed);

        let timeline = TimelineDeriver::default().derive(release, false, None).unwrap();

        assert_eq!(timeline.pre_campaign_start, date("2025-02-26"));
        assert_eq!(timeline.pre_campaign_end, date("2025-03-11"));
        assert_eq!(
            (timeline.pre_campaign_end - timeline.pre_campaign_start).num_days() + 1,
            14
        );
        assert_eq!(timeline.premiere_weekend_start, date("2025-03-14"));
        assert_eq!(timeline.premiere_weekend_start.weekday(), Weekday::Fri);
        assert_eq!(timeline.premiere_weekend_end, date("2025-03-16"));
        // Wed 26 Feb minus Tue, Mon, Fri.
        assert_eq!(timeline.creatives_deadline, date("2025-02-21"));
        assert_eq!(timeline.campaign_end, date("2025-03-16"));
        assert_eq!(timeline.final_report_date, date("2025-03-19"));
        assert!(!timeline.end_date_overridden);
    }

    #[test]
    fn test_content_adaptation_moves_deadline_earlier() {
        let timeline = TimelineDeriver::default()
            .derive(date("2025-03-12"), true, None)
            .unwrap();
        assert_eq!(timeline.creatives_deadline, date("2025-02-19"));
    }

    #[test]
    fn test_derive_is_idempotent() {
        let deriver = TimelineDeriver::default();
        let first = deriver.derive(date("2025-07-04"), true, Some(date("2025-07-20")));
        let second = deriver.derive(date("2025-07-04"), true, Some(date("2025-07-20")));
        assert_eq!(first, second);
    }

    // 2. Premiere weekend rule -----------------------------------------------

    #[test]
    fn test_premiere_weekend_for_every_weekday() {
        let cases = [
            ("2025-03-10", "2025-03-14"), // Mon -> following Fri
            ("2025-03-13", "2025-03-14"), // Thu
            ("2025-03-14", "2025-03-14"), // Fri
            ("2025-03-15", "2025-03-14"), // Sat -> enclosing Fri
            ("2025-03-16", "2025-03-14"), // Sun
            ("2025-03-17", "2025-03-21"), // Mon
        ];
        for (release, friday) in cases {
            let (start, end) = premiere_weekend(date(release));
            assert_eq!(start, date(friday), "release {release}");
            assert_eq!(end, date(friday) + Duration::days(2));
            assert_eq!(end.weekday(), Weekday::Sun);
        }
    }

    // 3. Manual end date -----------------------------------------------------

    #[test]
    fn test_manual_end_date_must_be_after_premiere_weekend() {
        let deriver = TimelineDeriver::default();
        let release = date("2025-03-12");

        let err = deriver.derive(release, false, Some(date("2025-03-16"))).unwrap_err();
        assert_eq!(err.field(), "campaign_end_date");
        assert!(deriver.derive(release, false, Some(date("2025-03-10"))).is_err());

        let timeline = deriver.derive(release, false, Some(date("2025-03-17"))).unwrap();
        assert_eq!(timeline.campaign_end, date("2025-03-17"));
        assert!(timeline.end_date_overridden);
        assert_eq!(timeline.final_report_date, date("2025-03-20"));
    }

    // 4. Business days -------------------------------------------------------

    #[test]
    fn test_business_day_arithmetic_skips_weekends() {
        // Saturday start: the weekend itself never counts.
        assert_eq!(subtract_business_days(date("2025-03-15"), 1), date("2025-03-14"));
        assert_eq!(add_business_days(date("2025-03-15"), 1), date("2025-03-17"));
        assert_eq!(add_business_days(date("2025-03-14"), 3), date("2025-03-19"));
        assert_eq!(add_business_days(date("2025-03-14"), 0), date("2025-03-14"));
        assert!(is_business_day(date("2025-03-14")));
        assert!(!is_business_day(date("2025-03-16")));
    }

    #[test]
    fn test_milestones_sorted() {
        let timeline = TimelineDeriver::default()
            .derive(date("2025-03-12"), false, None)
            .unwrap();
        let kinds: Vec<MilestoneKind> = timeline.milestones().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MilestoneKind::CreativesDeadline,
                MilestoneKind::PreCampaign,
                MilestoneKind::Release,
                MilestoneKind::PremiereWeekend,
                MilestoneKind::CampaignEnd,
                MilestoneKind::FinalReport,
            ]
        );
    }
}
