use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use indexmap::IndexMap;

use crate::models::{
    CategoryAggregate, CategoryId, CategoryShare, ContributorAggregate, IssueRecord, IssueStatus,
    SummaryStats, TrendBucket,
};

pub const TREND_MONTHS: i32 = 12;
const ACTIVE_WINDOW_DAYS: i64 = 30;

#[derive(Default)]
struct MonthTally<'a> {
    reported: u64,
    resolved: u64,
    contributors: HashSet<&'a str>,
}

/// Twelve calendar months ending with `now`'s month, oldest first. Empty
/// months are kept with zero counts.
pub fn build_trends(records: &[IssueRecord], now: DateTime<Utc>) -> Vec<TrendBucket> {
    let mut tallies: HashMap<(i32, u32), MonthTally<'_>> = HashMap::new();
    for record in records {
        let Some(created_at) = record.created_at else {
            continue;
        };
        let tally = tallies
            .entry((created_at.year(), created_at.month()))
            .or_default();
        tally.reported += 1;
        if record.status == IssueStatus::Resolved {
            tally.resolved += 1;
        }
        if let Some(id) = record.contributor_id() {
            tally.contributors.insert(id);
        }
    }

    let current = now.year() * 12 + now.month0() as i32;
    (0..TREND_MONTHS)
        .rev()
        .map(|back| {
            let index = current - back;
            let year = index.div_euclid(12);
            let month = index.rem_euclid(12) as u32 + 1;
            let tally = tallies.get(&(year, month));
            TrendBucket {
                month_label: month_label(year, month),
                year,
                month,
                reported: tally.map_or(0, |t| t.reported),
                resolved: tally.map_or(0, |t| t.resolved),
                active_contributor_count: tally.map_or(0, |t| t.contributors.len() as u64),
            }
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

/// One row per category that has at least one issue, in first-seen order.
pub fn build_category_distribution(
    categories: &IndexMap<CategoryId, CategoryAggregate>,
) -> Vec<CategoryShare> {
    categories
        .iter()
        .filter(|(_, agg)| agg.total > 0)
        .map(|(category, agg)| CategoryShare {
            category: *category,
            label: category.label().to_string(),
            total: agg.total,
            resolved: agg.resolved,
            resolution_rate: if agg.total == 0 {
                0.0
            } else {
                agg.resolved as f64 / agg.total as f64 * 100.0
            },
        })
        .collect()
}

pub fn summarize(ranked: &[ContributorAggregate], now: DateTime<Utc>) -> SummaryStats {
    let total_contributors = ranked.len();
    let active_cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let mean = |sum: f64| {
        if total_contributors == 0 {
            0.0
        } else {
            sum / total_contributors as f64
        }
    };

    SummaryStats {
        total_contributors,
        total_points: ranked.iter().map(|c| c.points).fold(0, u64::saturating_add),
        avg_resolution_rate: mean(ranked.iter().map(|c| c.resolution_rate).sum()),
        active_in_last_30_days: ranked
            .iter()
            .filter(|c| c.last_activity_at.is_some_and(|at| at >= active_cutoff))
            .count(),
        total_reported: ranked.iter().map(|c| c.reported).fold(0, u64::saturating_add),
        total_resolved: ranked.iter().map(|c| c.resolved).fold(0, u64::saturating_add),
        avg_engagement_score: mean(ranked.iter().map(|c| c.engagement_score).sum()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::accumulate::fixtures::{contributor, record};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn always_twelve_chronological_buckets() {
        let now = at(2026, 3, 20);
        let trends = build_trends(&[], now);
        assert_eq!(trends.len(), 12);
        assert_eq!((trends[0].year, trends[0].month), (2025, 4));
        assert_eq!((trends[11].year, trends[11].month), (2026, 3));
        assert_eq!(trends[11].month_label, "Mar 2026");
        assert!(trends.iter().all(|t| t.reported == 0 && t.resolved == 0));
        for pair in trends.windows(2) {
            assert!((pair[0].year, pair[0].month) < (pair[1].year, pair[1].month));
        }
    }

    #[test]
    fn buckets_count_records_by_month_and_year() {
        let now = at(2026, 1, 5);
        let ana = contributor("u-ana", "Ana");
        let ben = contributor("u-ben", "Ben");
        let records = vec![
            record("1", Some(ana.clone()), "road", IssueStatus::Resolved, Some(at(2026, 1, 2))),
            record("2", Some(ana.clone()), "road", IssueStatus::Pending, Some(at(2026, 1, 3))),
            record("3", Some(ben.clone()), "road", IssueStatus::Resolved, Some(at(2025, 12, 9))),
            record("4", None, "road", IssueStatus::Pending, Some(at(2025, 12, 10))),
            // same month a year earlier falls outside the window
            record("5", Some(ben.clone()), "road", IssueStatus::Resolved, Some(at(2025, 1, 9))),
            record("6", Some(ben), "road", IssueStatus::Resolved, None),
        ];

        let trends = build_trends(&records, now);
        let jan = &trends[11];
        assert_eq!((jan.reported, jan.resolved, jan.active_contributor_count), (2, 1, 1));
        let dec = &trends[10];
        assert_eq!((dec.reported, dec.resolved, dec.active_contributor_count), (2, 1, 1));
        assert_eq!(trends[0].month_label, "Feb 2025");
        assert_eq!(trends[0].reported, 0);
        let counted: u64 = trends.iter().map(|t| t.reported).sum();
        assert_eq!(counted, 4);
    }

    #[test]
    fn distribution_skips_empty_categories_and_guards_rate() {
        let mut categories = IndexMap::new();
        categories.insert(CategoryId::WaterSupply, CategoryAggregate { total: 4, resolved: 1 });
        categories.insert(CategoryId::Transport, CategoryAggregate { total: 0, resolved: 0 });
        categories.insert(CategoryId::Other, CategoryAggregate { total: 2, resolved: 2 });

        let rows = build_category_distribution(&categories);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, CategoryId::WaterSupply);
        assert_eq!(rows[0].resolution_rate, 25.0);
        assert_eq!(rows[1].resolution_rate, 100.0);
        assert_eq!(rows[1].label, "Other");
    }

    #[test]
    fn summary_over_empty_list_is_zeroed() {
        let summary = summarize(&[], at(2026, 5, 1));
        assert_eq!(summary, SummaryStats::default());
    }

    #[test]
    fn summary_aggregates_ranked_contributors() {
        let now = at(2026, 5, 31);
        let mut a = ContributorAggregate::from_ref(&contributor("a", "A"));
        a.points = 300;
        a.reported = 5;
        a.resolved = 5;
        a.resolution_rate = 100.0;
        a.engagement_score = 10.0;
        a.last_activity_at = Some(at(2026, 5, 20));
        let mut b = ContributorAggregate::from_ref(&contributor("b", "B"));
        b.points = 100;
        b.reported = 2;
        b.resolution_rate = 0.0;
        b.engagement_score = 2.0;
        b.last_activity_at = Some(at(2026, 3, 1));

        let summary = summarize(&[a, b], now);
        assert_eq!(summary.total_contributors, 2);
        assert_eq!(summary.total_points, 400);
        assert_eq!(summary.avg_resolution_rate, 50.0);
        assert_eq!(summary.active_in_last_30_days, 1);
        assert_eq!(summary.total_reported, 7);
        assert_eq!(summary.total_resolved, 5);
        assert_eq!(summary.avg_engagement_score, 6.0);
    }
}
