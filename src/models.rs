use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::RequestError;

/// Who submitted an issue. Absent on anonymous submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRef {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl IssueStatus {
    /// Unrecognized labels land in `Pending`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "resolved" => IssueStatus::Resolved,
            "in-progress" | "in_progress" | "in progress" => IssueStatus::InProgress,
            _ => IssueStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
        }
    }
}

/// One complaint as supplied by the issue store. Counters are already
/// defaulted to zero by whoever built the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: String,
    pub contributor: Option<ContributorRef>,
    pub raw_category: String,
    pub status: IssueStatus,
    pub votes: u64,
    pub comments: u64,
    pub upvotes: u64,
    pub views: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl IssueRecord {
    /// Grouping key for contributor aggregation. Blank ids count as absent.
    pub fn contributor_id(&self) -> Option<&str> {
        self.contributor
            .as_ref()
            .map(|c| c.id.trim())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    RoadInfrastructure,
    SanitationWaste,
    WaterSupply,
    Electricity,
    Security,
    Transport,
    Other,
}

impl CategoryId {
    pub const ALL: [CategoryId; 7] = [
        CategoryId::RoadInfrastructure,
        CategoryId::SanitationWaste,
        CategoryId::WaterSupply,
        CategoryId::Electricity,
        CategoryId::Security,
        CategoryId::Transport,
        CategoryId::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryId::RoadInfrastructure => "road_infrastructure",
            CategoryId::SanitationWaste => "sanitation_waste",
            CategoryId::WaterSupply => "water_supply",
            CategoryId::Electricity => "electricity",
            CategoryId::Security => "security",
            CategoryId::Transport => "transport",
            CategoryId::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryId::RoadInfrastructure => "Road & Infrastructure",
            CategoryId::SanitationWaste => "Sanitation & Waste",
            CategoryId::WaterSupply => "Water Supply",
            CategoryId::Electricity => "Electricity",
            CategoryId::Security => "Security & Safety",
            CategoryId::Transport => "Transport & Traffic",
            CategoryId::Other => "Other",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CategoryId::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| RequestError::UnknownCategory(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Newcomer,
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Legend,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Newcomer => "Newcomer",
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Expert => "Expert",
            Level::Legend => "Legend",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Running totals for one contributor, plus the derived leaderboard fields
/// filled in by scoring and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorAggregate {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub avatar: Option<String>,

    pub reported: u64,
    pub resolved: u64,
    pub in_progress: u64,
    pub pending: u64,
    pub category_histogram: IndexMap<CategoryId, u64>,
    pub total_votes: u64,
    pub total_comments: u64,
    pub total_upvotes: u64,
    pub total_views: u64,
    pub last_activity_at: Option<DateTime<Utc>>,

    pub resolution_rate: f64,
    pub engagement_score: f64,
    pub points: u64,
    pub impact_score: u64,
    pub level: Level,
    pub top_category: Option<CategoryId>,
    pub streak_days: u32,
    pub rank: usize,
}

impl ContributorAggregate {
    pub fn from_ref(contributor: &ContributorRef) -> Self {
        let name = if contributor.name.trim().is_empty() {
            "Anonymous".to_string()
        } else {
            contributor.name.clone()
        };
        Self {
            id: contributor.id.trim().to_string(),
            name,
            email: contributor.email.clone(),
            location: contributor.location.clone(),
            avatar: contributor.avatar.clone(),
            reported: 0,
            resolved: 0,
            in_progress: 0,
            pending: 0,
            category_histogram: IndexMap::new(),
            total_votes: 0,
            total_comments: 0,
            total_upvotes: 0,
            total_views: 0,
            last_activity_at: None,
            resolution_rate: 0.0,
            engagement_score: 0.0,
            points: 0,
            impact_score: 0,
            level: Level::Newcomer,
            top_category: None,
            streak_days: 0,
            rank: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub total: u64,
    pub resolved: u64,
}

/// One row of the published category distribution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: CategoryId,
    pub label: String,
    pub total: u64,
    pub resolved: u64,
    pub resolution_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub month_label: String,
    pub year: i32,
    pub month: u32,
    pub reported: u64,
    pub resolved: u64,
    pub active_contributor_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_contributors: usize,
    pub total_points: u64,
    pub avg_resolution_rate: f64,
    pub active_in_last_30_days: usize,
    pub total_reported: u64,
    pub total_resolved: u64,
    pub avg_engagement_score: f64,
}

/// A fully computed leaderboard state. Never mutated after publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub contributors: Vec<ContributorAggregate>,
    pub category_distribution: Vec<CategoryShare>,
    pub trends: Vec<TrendBucket>,
    pub summary: SummaryStats,
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
}

impl LeaderboardSnapshot {
    /// Placeholder served before the first successful refresh.
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            contributors: Vec::new(),
            category_distribution: Vec::new(),
            trends: Vec::new(),
            summary: SummaryStats::default(),
            generated_at,
            record_count: 0,
        }
    }
}
