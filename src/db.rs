use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ContributorRef, IssueRecord, IssueStatus};
use crate::store::{clamp_count, CsvRow, IssueStore, TimeRange};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Issue store backed by the `civic_leaderboard` schema.
#[derive(Debug, Clone)]
pub struct PgIssueStore {
    pool: PgPool,
}

impl PgIssueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl IssueStore for PgIssueStore {
    async fn fetch(&self, range: TimeRange) -> anyhow::Result<Vec<IssueRecord>> {
        fetch_issues(&self.pool, range.cutoff(Utc::now())).await
    }
}

pub async fn fetch_issues(
    pool: &PgPool,
    cutoff: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<IssueRecord>> {
    let mut query = String::from(
        "SELECT i.source_key, i.contributor_id, c.full_name, c.email, c.location, c.avatar_url, \
         i.category, i.status, i.votes, i.comments, i.upvotes, i.views, i.created_at \
         FROM civic_leaderboard.issues i \
         LEFT JOIN civic_leaderboard.contributors c ON c.id = i.contributor_id",
    );
    if cutoff.is_some() {
        query.push_str(" WHERE i.created_at >= $1");
    }
    query.push_str(" ORDER BY i.seq");

    let mut rows = sqlx::query(&query);
    if let Some(value) = cutoff {
        rows = rows.bind(value);
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to load issues")?;
    let mut issues = Vec::with_capacity(records.len());

    for row in records {
        let contributor_id: Option<String> = row.get("contributor_id");
        let contributor = contributor_id.map(|id| ContributorRef {
            id,
            name: row.get::<Option<String>, _>("full_name").unwrap_or_default(),
            email: row.get::<Option<String>, _>("email").unwrap_or_default(),
            location: row.get("location"),
            avatar: row.get("avatar_url"),
        });
        let status: String = row.get("status");

        issues.push(IssueRecord {
            id: row.get("source_key"),
            contributor,
            raw_category: row.get("category"),
            status: IssueStatus::parse_lenient(&status),
            votes: clamp_count(Some(row.get::<i32, _>("votes").into())),
            comments: clamp_count(Some(row.get::<i32, _>("comments").into())),
            upvotes: clamp_count(Some(row.get::<i32, _>("upvotes").into())),
            views: clamp_count(Some(row.get::<i32, _>("views").into())),
            created_at: row.get("created_at"),
        });
    }

    debug!(count = issues.len(), "loaded issues from postgres");
    Ok(issues)
}

async fn upsert_contributor(pool: &PgPool, contributor: &ContributorRef) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO civic_leaderboard.contributors (id, full_name, email, location, avatar_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            email = EXCLUDED.email,
            location = EXCLUDED.location,
            avatar_url = COALESCE(EXCLUDED.avatar_url, civic_leaderboard.contributors.avatar_url)
        "#,
    )
    .bind(&contributor.id)
    .bind(&contributor.name)
    .bind(&contributor.email)
    .bind(&contributor.location)
    .bind(&contributor.avatar)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert contributor {}", contributor.id))?;
    Ok(())
}

/// Inserts one issue keyed by `record.id` as source key. Returns false when
/// the key was already present.
async fn insert_issue(pool: &PgPool, record: &IssueRecord) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO civic_leaderboard.issues
        (id, contributor_id, category, status, votes, comments, upvotes, views,
         created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record.contributor_id())
    .bind(&record.raw_category)
    .bind(record.status.as_str())
    .bind(to_db_count(record.votes))
    .bind(to_db_count(record.comments))
    .bind(to_db_count(record.upvotes))
    .bind(to_db_count(record.views))
    .bind(record.created_at)
    .bind(&record.id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert issue {}", record.id))?;

    Ok(result.rows_affected() > 0)
}

fn to_db_count(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let contributors = vec![
        ("c-amara", "Amara Nwosu", "amara.nwosu@civicdesk.org", Some("Riverside")),
        ("c-jonas", "Jonas Keller", "jonas.keller@civicdesk.org", Some("Old Town")),
        ("c-priya", "Priya Raman", "priya.raman@civicdesk.org", Some("Hillcrest")),
        ("c-mateo", "Mateo Ruiz", "mateo.ruiz@civicdesk.org", None),
    ];

    for (id, name, email, location) in &contributors {
        upsert_contributor(
            pool,
            &ContributorRef {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                location: location.map(str::to_string),
                avatar: None,
            },
        )
        .await?;
    }

    let now = Utc::now();
    let issues = vec![
        ("seed-001", Some("c-amara"), "Pothole on road near school", "resolved", 14, 6, 9, 210, 2),
        ("seed-002", Some("c-amara"), "Garbage not collected", "resolved", 8, 3, 4, 95, 20),
        ("seed-003", Some("c-amara"), "Water pipe burst", "in-progress", 5, 2, 1, 60, 45),
        ("seed-004", Some("c-jonas"), "Streetlight electric fault", "pending", 3, 1, 0, 40, 1),
        ("seed-005", Some("c-jonas"), "Illegal parking on sidewalk", "resolved", 11, 7, 5, 130, 70),
        ("seed-006", Some("c-priya"), "Bus stop safety concern", "resolved", 20, 12, 15, 320, 0),
        ("seed-007", Some("c-priya"), "Road infrastructure crack", "resolved", 6, 2, 3, 75, 110),
        ("seed-008", Some("c-priya"), "Overflowing waste bins", "pending", 2, 0, 1, 18, 200),
        ("seed-009", Some("c-mateo"), "Noise complaint", "pending", 1, 0, 0, 12, 5),
        ("seed-010", None, "Traffic signal broken", "resolved", 9, 4, 2, 88, 14),
    ];

    for (key, contributor_id, category, status, votes, comments, upvotes, views, days_ago) in issues
    {
        let contributor = contributor_id.map(|id| ContributorRef {
            id: id.to_string(),
            name: String::new(),
            email: String::new(),
            location: None,
            avatar: None,
        });
        let record = IssueRecord {
            id: key.to_string(),
            contributor,
            raw_category: category.to_string(),
            status: IssueStatus::parse_lenient(status),
            votes,
            comments,
            upvotes,
            views,
            created_at: Some(now - Duration::days(days_ago)),
        };
        insert_issue(pool, &record).await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(line = index + 2, error = %err, "skipping unreadable csv row");
                continue;
            }
        };
        let has_key = row
            .source_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        let mut record = row.into_record(index + 2);
        if !has_key {
            record.id = format!("import-{}", Uuid::new_v4());
        }

        if let Some(contributor) = record.contributor.as_ref() {
            upsert_contributor(pool, contributor).await?;
        }
        if insert_issue(pool, &record).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
