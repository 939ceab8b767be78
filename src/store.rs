use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{ContributorRef, IssueRecord, IssueStatus};

/// Coarse pre-filter hint passed to the issue store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Today,
    Week,
    Month,
    Quarter,
    Year,
    #[default]
    All,
}

impl TimeRange {
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            TimeRange::Week => Some(now - ChronoDuration::days(7)),
            TimeRange::Month => Some(now - ChronoDuration::days(30)),
            TimeRange::Quarter => Some(now - ChronoDuration::days(90)),
            TimeRange::Year => Some(now - ChronoDuration::days(365)),
            TimeRange::All => None,
        }
    }

    /// Records without a timestamp only pass the `All` range.
    pub fn admits(&self, record: &IssueRecord, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            None => true,
            Some(cutoff) => record.created_at.is_some_and(|at| at >= cutoff),
        }
    }
}

/// Source of issue records. Every fetch is a full replacement of the
/// previous pull, not an increment.
pub trait IssueStore: Send + Sync + 'static {
    fn fetch(
        &self,
        range: TimeRange,
    ) -> impl Future<Output = anyhow::Result<Vec<IssueRecord>>> + Send;
}

/// Re-reads a CSV export on every fetch.
#[derive(Debug, Clone)]
pub struct CsvIssueStore {
    path: PathBuf,
}

impl CsvIssueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IssueStore for CsvIssueStore {
    async fn fetch(&self, range: TimeRange) -> anyhow::Result<Vec<IssueRecord>> {
        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || read_csv_records(&path))
            .await
            .context("csv reader task failed")??;
        let now = Utc::now();
        Ok(records.into_iter().filter(|r| range.admits(r, now)).collect())
    }
}

/// Row layout shared by the CSV store and `import`.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvRow {
    #[serde(default)]
    pub source_key: Option<String>,
    #[serde(default)]
    pub contributor_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub votes: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub comments: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub upvotes: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub views: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CsvRow {
    pub fn into_record(self, line: usize) -> IssueRecord {
        let contributor = non_blank(self.contributor_id).map(|id| ContributorRef {
            id,
            name: self.full_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            location: non_blank(self.location),
            avatar: None,
        });

        IssueRecord {
            id: non_blank(self.source_key).unwrap_or_else(|| format!("csv-{line}")),
            contributor,
            raw_category: self.category.unwrap_or_default(),
            status: IssueStatus::parse_lenient(self.status.as_deref().unwrap_or_default()),
            votes: clamp_count(self.votes),
            comments: clamp_count(self.comments),
            upvotes: clamp_count(self.upvotes),
            views: clamp_count(self.views),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

pub fn read_csv_records(path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        match result {
            Ok(row) => records.push(row.into_record(line)),
            Err(err) => {
                warn!(path = %path.display(), line, error = %err, "skipping unreadable csv row")
            }
        }
    }
    Ok(records)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn clamp_count(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
