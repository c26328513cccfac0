//! Advisory scheduling and audience conflict check against other campaigns.
//!
//! Calls are debounced: only the last call inside the quiet window reaches
//! the lookup service, and a response that arrives after a newer call was
//! made is discarded. Lookup failures never block the wizard; they degrade
//! to a report with no conflicts.

use async_trait::async_trait;
use campaign_core::config::ConflictPolicy;
use campaign_core::PlatformId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

// ─── Types ─────────────────────────────────────────────────────────────────

/// What the wizard knows about the campaign being configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCriteria {
    pub genre: String,
    pub target_audience: String,
    pub territory: String,
    pub premiere_start: NaiveDate,
    pub premiere_end: NaiveDate,
    pub platforms: Vec<PlatformId>,
}

/// A campaign already booked by another distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingCampaign {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    #[serde(default)]
    pub target_audience: String,
    pub territory: String,
    pub premiere_start: NaiveDate,
    pub premiere_end: NaiveDate,
    #[serde(default)]
    pub platforms: Vec<PlatformId>,
}

impl ExistingCampaign {
    pub fn overlaps_dates(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.premiere_start <= end && start <= self.premiere_end
    }

    pub fn in_territory(&self, territory: &str) -> bool {
        self.territory.trim().eq_ignore_ascii_case(territory.trim())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    #[default]
    None,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapDimension {
    Territory,
    DateRange,
    Genre,
    Audience,
    Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingCampaign {
    pub campaign_id: Uuid,
    pub title: String,
    pub premiere_start: NaiveDate,
    pub dimensions: Vec<OverlapDimension>,
    pub shared_platforms: Vec<PlatformId>,
}

/// Displayed in the schedule step; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub severity: ConflictSeverity,
    pub conflicts: Vec<ConflictingCampaign>,
}

impl ConflictReport {
    pub fn none() -> Self {
        Self::default()
    }

    /// High severity stops non-admin users at the schedule step.
    pub fn blocks_progression(&self, is_admin: bool) -> bool {
        self.severity == ConflictSeverity::High && !is_admin
    }
}

/// Result of a debounced [`ConflictDetector::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Report(ConflictReport),
    /// A newer call was made; the caller must ignore this one.
    Superseded,
}

impl CheckOutcome {
    pub fn into_report(self) -> Option<ConflictReport> {
        match self {
            CheckOutcome::Report(report) => Some(report),
            CheckOutcome::Superseded => None,
        }
    }
}

/// Lookup service holding the other campaigns.
#[async_trait]
pub trait CampaignLookup: Send + Sync {
    async fn find_candidates(&self, criteria: &ConflictCriteria) -> anyhow::Result<Vec<ExistingCampaign>>;
}

// ─── Classification ────────────────────────────────────────────────────────

/// Classify candidates against the criteria.
///
/// A candidate only conflicts when it runs in the same territory over an
/// overlapping premiere window. The conflict is high when it also shares
/// the genre and either a platform or the audience; otherwise it is low.
pub fn classify(
    criteria: &ConflictCriteria,
    candidates: &[ExistingCampaign],
    audience_overlap_threshold: f64,
) -> ConflictReport {
    let wanted: HashSet<&PlatformId> = criteria.platforms.iter().collect();
    let mut severity = ConflictSeverity::None;
    let mut conflicts = Vec::new();

    for candidate in candidates {
        if !candidate.in_territory(&criteria.territory)
            || !candidate.overlaps_dates(criteria.premiere_start, criteria.premiere_end)
        {
            continue;
        }
        let mut dimensions = vec![OverlapDimension::Territory, OverlapDimension::DateRange];

        let same_genre = candidate.genre.trim().eq_ignore_ascii_case(criteria.genre.trim());
        if same_genre {
            dimensions.push(OverlapDimension::Genre);
        }
        let same_audience = audience_overlap(&criteria.target_audience, &candidate.target_audience)
            >= audience_overlap_threshold;
        if same_audience {
            dimensions.push(OverlapDimension::Audience);
        }
        let shared_platforms: Vec<PlatformId> = candidate
            .platforms
            .iter()
            .filter(|p| wanted.contains(p))
            .cloned()
            .collect();
        if !shared_platforms.is_empty() {
            dimensions.push(OverlapDimension::Platform);
        }

        let level = if same_genre && (same_audience || !shared_platforms.is_empty()) {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Low
        };
        severity = severity.max(level);

        conflicts.push(ConflictingCampaign {
            campaign_id: candidate.id,
            title: candidate.title.clone(),
            premiere_start: candidate.premiere_start,
            dimensions,
            shared_platforms,
        });
    }

    conflicts.sort_by(|a, b| {
        b.dimensions
            .len()
            .cmp(&a.dimensions.len())
            .then(a.premiere_start.cmp(&b.premiere_start))
            .then_with(|| a.title.cmp(&b.title))
    });

    ConflictReport {
        severity,
        conflicts,
    }
}

/// Share of keywords the smaller audience description has in common with
/// the other one, in `[0, 1]`.
fn audience_overlap(a: &str, b: &str) -> f64 {
    let left = keywords(a);
    let right = keywords(b);
    let smaller = left.len().min(right.len());
    if smaller == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / smaller as f64
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

// ─── Detector ──────────────────────────────────────────────────────────────

/// Debounced conflict checker with stale-response protection.
pub struct ConflictDetector {
    lookup: Arc<dyn CampaignLookup>,
    policy: ConflictPolicy,
    generation: AtomicU64,
}

impl ConflictDetector {
    pub fn new(lookup: Arc<dyn CampaignLookup>, policy: ConflictPolicy) -> Self {
        Self {
            lookup,
            policy,
            generation: AtomicU64::new(0),
        }
    }

    /// Check the criteria once input has been quiet for the debounce window.
    ///
    /// Returns [`CheckOutcome::Superseded`] when a newer call arrived before
    /// this one's answer could be shown.
    pub async fn check(&self, criteria: ConflictCriteria) -> CheckOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(Duration::from_millis(self.policy.debounce_ms)).await;
        if !self.is_current(ticket) {
            metrics::counter!("conflict.superseded").increment(1);
            return CheckOutcome::Superseded;
        }

        metrics::counter!("conflict.lookups").increment(1);
        let timeout = Duration::from_millis(self.policy.lookup_timeout_ms);
        let report = match tokio::time::timeout(timeout, self.lookup.find_candidates(&criteria)).await {
            Ok(Ok(candidates)) => {
                classify(&criteria, &candidates, self.policy.audience_overlap_threshold)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Conflict lookup failed, treating as no conflict");
                metrics::counter!("conflict.lookup_failures").increment(1);
                ConflictReport::none()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.policy.lookup_timeout_ms,
                    "Conflict lookup timed out, treating as no conflict"
                );
                metrics::counter!("conflict.lookup_failures").increment(1);
                ConflictReport::none()
            }
        };

        if !self.is_current(ticket) {
            debug!(ticket, "Discarding stale conflict report");
            metrics::counter!("conflict.stale_discarded").increment(1);
            return CheckOutcome::Superseded;
        }
        CheckOutcome::Report(report)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn criteria(genre: &str) -> ConflictCriteria {
        ConflictCriteria {
            genre: genre.to_string(),
            target_audience: "young adults who love horror films".to_string(),
            territory: "ES".to_string(),
            premiere_start: date("2025-03-14"),
            premiere_end: date("2025-03-16"),
            platforms: vec![PlatformId::from("meta"), PlatformId::from("tiktok")],
        }
    }

    fn existing(title: &str, genre: &str, start: &str, platforms: &[&str]) -> ExistingCampaign {
        let start = date(start);
        ExistingCampaign {
            id: Uuid::new_v4(),
            title: title.to_string(),
            genre: genre.to_string(),
            target_audience: "families with children".to_string(),
            territory: "es".to_string(),
            premiere_start: start,
            premiere_end: start + chrono::Duration::days(2),
            platforms: platforms.iter().map(|p| PlatformId::from(*p)).collect(),
        }
    }

    /// Records every lookup and answers after `delay`.
    struct RecordingLookup {
        calls: Mutex<Vec<ConflictCriteria>>,
        delay: Duration,
        candidates: Vec<ExistingCampaign>,
        fail: bool,
    }

    impl RecordingLookup {
        fn new(candidates: Vec<ExistingCampaign>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                candidates,
                fail: false,
            }
        }

        fn calls(&self) -> Vec<ConflictCriteria> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CampaignLookup for RecordingLookup {
        async fn find_candidates(&self, criteria: &ConflictCriteria) -> anyhow::Result<Vec<ExistingCampaign>> {
            self.calls.lock().unwrap().push(criteria.clone());
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("campaign service unavailable");
            }
            Ok(self.candidates.clone())
        }
    }

    // 1. Classification ------------------------------------------------------

    #[test]
    fn test_classify_high_on_genre_and_platform() {
        let candidates = vec![existing("Night Shift", "Horror", "2025-03-13", &["meta"])];
        let report = classify(&criteria("horror"), &candidates, 0.5);

        assert_eq!(report.severity, ConflictSeverity::High);
        assert_eq!(report.conflicts.len(), 1);
        assert!(report.conflicts[0].dimensions.contains(&OverlapDimension::Genre));
        assert_eq!(report.conflicts[0].shared_platforms, vec![PlatformId::from("meta")]);
        assert!(report.blocks_progression(false));
        assert!(!report.blocks_progression(true));
    }

    #[test]
    fn test_classify_low_when_only_schedule_overlaps() {
        let candidates = vec![existing("Paw Patrol", "Animation", "2025-03-16", &["youtube"])];
        let report = classify(&criteria("horror"), &candidates, 0.5);

        assert_eq!(report.severity, ConflictSeverity::Low);
        assert_eq!(
            report.conflicts[0].dimensions,
            vec![OverlapDimension::Territory, OverlapDimension::DateRange]
        );
        assert!(!report.blocks_progression(false));
    }

    #[test]
    fn test_classify_high_on_genre_and_audience() {
        let mut candidate = existing("The Cellar", "horror", "2025-03-14", &[]);
        candidate.target_audience = "Horror fans, young adults".to_string();
        let report = classify(&criteria("Horror"), &[candidate], 0.5);

        assert_eq!(report.severity, ConflictSeverity::High);
        assert!(report.conflicts[0].dimensions.contains(&OverlapDimension::Audience));
    }

    #[test]
    fn test_classify_ignores_other_territories_and_dates() {
        let mut elsewhere = existing("Abroad", "Horror", "2025-03-14", &["meta"]);
        elsewhere.territory = "PT".to_string();
        let later = existing("Later", "Horror", "2025-04-04", &["meta"]);

        let report = classify(&criteria("Horror"), &[elsewhere, later], 0.5);
        assert_eq!(report, ConflictReport::none());
    }

    #[test]
    fn test_classify_orders_by_overlap() {
        let candidates = vec![
            existing("Weak", "Drama", "2025-03-14", &[]),
            existing("Strong", "Horror", "2025-03-15", &["meta", "tiktok"]),
        ];
        let report = classify(&criteria("Horror"), &candidates, 0.5);
        let titles: Vec<&str> = report.conflicts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Strong", "Weak"]);
    }

    // 2. Debounce and stale responses ----------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_debounce_collapses_rapid_calls() {
        let lookup = Arc::new(RecordingLookup::new(vec![existing(
            "Night Shift",
            "Horror",
            "2025-03-14",
            &["meta"],
        )]));
        let detector = ConflictDetector::new(lookup.clone(), ConflictPolicy::default());

        let (first, second) = tokio::join!(detector.check(criteria("Comedy")), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            detector.check(criteria("Horror")).await
        });

        assert_eq!(first, CheckOutcome::Superseded);
        let report = second.into_report().unwrap();
        assert_eq!(report.severity, ConflictSeverity::High);

        let calls = lookup.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].genre, "Horror");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_in_flight_response_discarded() {
        let mut slow = RecordingLookup::new(Vec::new());
        slow.delay = Duration::from_millis(1000);
        let lookup = Arc::new(slow);
        let detector = ConflictDetector::new(lookup.clone(), ConflictPolicy::default());

        let (first, second) = tokio::join!(detector.check(criteria("Comedy")), async {
            // First call is already waiting on the lookup by now.
            tokio::time::sleep(Duration::from_millis(600)).await;
            detector.check(criteria("Horror")).await
        });

        assert_eq!(first, CheckOutcome::Superseded);
        assert!(matches!(second, CheckOutcome::Report(_)));
        assert_eq!(lookup.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_degrades_to_none() {
        let mut failing = RecordingLookup::new(Vec::new());
        failing.fail = true;
        let detector = ConflictDetector::new(Arc::new(failing), ConflictPolicy::default());

        let outcome = detector.check(criteria("Horror")).await;
        assert_eq!(outcome, CheckOutcome::Report(ConflictReport::none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout_degrades_to_none() {
        let mut hung = RecordingLookup::new(vec![existing("Night Shift", "Horror", "2025-03-14", &["meta"])]);
        hung.delay = Duration::from_secs(60);
        let policy = ConflictPolicy {
            lookup_timeout_ms: 2000,
            ..ConflictPolicy::default()
        };
        let detector = ConflictDetector::new(Arc::new(hung), policy);

        let outcome = detector.check(criteria("Horror")).await;
        assert_eq!(outcome.into_report(), Some(ConflictReport::none()));
    }
}
