//! In-memory campaign directory backed by DashMap.
//!
//! Production: replace with the hosted campaign service. This provides the
//! same lookup surface for development and testing.

use crate::conflicts::{CampaignLookup, ConflictCriteria, ExistingCampaign};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

/// Thread-safe directory of booked campaigns.
pub struct InMemoryCampaignDirectory {
    campaigns: DashMap<Uuid, ExistingCampaign>,
}

impl InMemoryCampaignDirectory {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
        }
    }

    pub fn from_campaigns(campaigns: impl IntoIterator<Item = ExistingCampaign>) -> Self {
        let directory = Self::new();
        for campaign in campaigns {
            directory.insert(campaign);
        }
        info!(
            campaigns = directory.len(),
            "Campaign directory initialized (in-memory, development mode)"
        );
        directory
    }

    pub fn insert(&self, campaign: ExistingCampaign) {
        self.campaigns.insert(campaign.id, campaign);
    }

    pub fn remove(&self, id: &Uuid) -> Option<ExistingCampaign> {
        self.campaigns.remove(id).map(|(_, campaign)| campaign)
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

impl Default for InMemoryCampaignDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampaignLookup for InMemoryCampaignDirectory {
    /// Campaigns in the same territory whose premiere window overlaps.
    async fn find_candidates(&self, criteria: &ConflictCriteria) -> anyhow::Result<Vec<ExistingCampaign>> {
        let mut candidates: Vec<ExistingCampaign> = self
            .campaigns
            .iter()
            .filter(|e| {
                e.value().in_territory(&criteria.territory)
                    && e.value().overlaps_dates(criteria.premiere_start, criteria.premiere_end)
            })
            .map(|e| e.value().clone())
            .collect();
        candidates.sort_by(|a, b| a.premiere_start.cmp(&b.premiere_start));
        Ok(candidates)
    }
}
