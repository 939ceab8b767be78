use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::LeaderboardEngine;
use crate::errors::RequestError;
use crate::models::{
    CategoryShare, ContributorAggregate, LeaderboardSnapshot, SummaryStats, TrendBucket,
};
use crate::query::{self, ContributorFilter};
use crate::ranking;
use crate::store::IssueStore;

/// A read against the published snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRequest {
    #[serde(default)]
    pub search: Option<String>,
    /// Category id or `"all"`.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub contributor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorRank {
    pub contributor: ContributorAggregate,
    /// Position on the full leaderboard, regardless of filters.
    pub rank: usize,
    /// Whether the contributor is listed in this response's `contributors`.
    pub in_top: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub generated_at: DateTime<Utc>,
    pub stale: bool,
    pub contributors: Vec<ContributorAggregate>,
    pub total_matching: usize,
    pub contributor_rank: Option<ContributorRank>,
    pub category_distribution: Vec<CategoryShare>,
    pub trends: Vec<TrendBucket>,
    pub summary: SummaryStats,
}

pub fn build_response(
    snapshot: &LeaderboardSnapshot,
    request: &LeaderboardRequest,
    default_limit: usize,
    stale: bool,
) -> Result<LeaderboardResponse, RequestError> {
    let filter = ContributorFilter {
        search_text: request.search.clone(),
        category: ContributorFilter::parse_category(request.category.as_deref())?,
    };
    let limit = request.limit.unwrap_or(default_limit);
    let matching = query::query(snapshot, &filter);
    let total_matching = matching.len();
    let contributors: Vec<ContributorAggregate> =
        matching.into_iter().take(limit).cloned().collect();

    // Filters may drop a contributor whose global rank is within `limit`.
    let contributor_rank = request.contributor_id.as_deref().and_then(|id| {
        ranking::find_rank(id, &snapshot.contributors, limit).map(|hit| ContributorRank {
            contributor: hit.contributor.clone(),
            rank: hit.rank,
            in_top: hit.in_top && contributors.iter().any(|c| c.id == hit.contributor.id),
        })
    });

    Ok(LeaderboardResponse {
        generated_at: snapshot.generated_at,
        stale,
        total_matching,
        contributors,
        contributor_rank,
        category_distribution: snapshot.category_distribution.clone(),
        trends: snapshot.trends.clone(),
        summary: snapshot.summary.clone(),
    })
}

impl<S: IssueStore> LeaderboardEngine<S> {
    /// Answers a request from the current snapshot without recomputing.
    pub async fn respond(
        &self,
        request: &LeaderboardRequest,
    ) -> Result<LeaderboardResponse, RequestError> {
        let snapshot = self.snapshot().await;
        build_response(&snapshot, request, self.config().top_n, self.is_stale())
    }
}
