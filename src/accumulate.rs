use indexmap::IndexMap;

use crate::category;
use crate::models::{
    CategoryAggregate, CategoryId, ContributorAggregate, IssueRecord, IssueStatus,
};

/// Contributor totals in first-seen order, plus global category totals.
#[derive(Debug, Default)]
pub struct Accumulation {
    pub contributors: IndexMap<String, ContributorAggregate>,
    pub categories: IndexMap<CategoryId, CategoryAggregate>,
    pub skipped_anonymous: usize,
}

pub fn accumulate(records: &[IssueRecord]) -> Accumulation {
    let mut acc = Accumulation::default();

    for record in records {
        let (Some(contributor_id), Some(contributor)) =
            (record.contributor_id(), record.contributor.as_ref())
        else {
            acc.skipped_anonymous += 1;
            continue;
        };

        let entry = acc
            .contributors
            .entry(contributor_id.to_string())
            .or_insert_with(|| ContributorAggregate::from_ref(contributor));

        entry.reported = entry.reported.saturating_add(1);
        match record.status {
            IssueStatus::Resolved => entry.resolved = entry.resolved.saturating_add(1),
            IssueStatus::InProgress => entry.in_progress = entry.in_progress.saturating_add(1),
            IssueStatus::Pending => entry.pending = entry.pending.saturating_add(1),
        }

        let category = category::normalize(&record.raw_category);
        let count = entry.category_histogram.entry(category).or_insert(0);
        *count = count.saturating_add(1);

        let global = acc.categories.entry(category).or_default();
        global.total = global.total.saturating_add(1);
        if record.status == IssueStatus::Resolved {
            global.resolved = global.resolved.saturating_add(1);
        }

        // Counters come straight from the store and may be arbitrarily large.
        entry.total_votes = entry.total_votes.saturating_add(record.votes);
        entry.total_comments = entry.total_comments.saturating_add(record.comments);
        entry.total_upvotes = entry.total_upvotes.saturating_add(record.upvotes);
        entry.total_views = entry.total_views.saturating_add(record.views);

        if let Some(created_at) = record.created_at {
            entry.last_activity_at = Some(match entry.last_activity_at {
                Some(current) if current >= created_at => current,
                _ => created_at,
            });
        }
    }

    acc
}


#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::fixtures::{contributor, record};
    use super::*;

    #[test]
    fn groups_records_by_contributor_in_first_seen_order() {
        let ana = contributor("u-ana", "Ana Silva");
        let ben = contributor("u-ben", "Ben Okafor");
        let records = vec![
            record("1", Some(ben.clone()), "road", IssueStatus::Resolved, None),
            record("2", Some(ana.clone()), "water", IssueStatus::Pending, None),
            record("3", Some(ben.clone()), "garbage", IssueStatus::InProgress, None),
            record("4", Some(ben), "nonsense", IssueStatus::Pending, None),
        ];

        let acc = accumulate(&records);
        let ids: Vec<&str> = acc.contributors.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["u-ben", "u-ana"]);

        let ben = &acc.contributors["u-ben"];
        assert_eq!(ben.reported, 3);
        assert_eq!(ben.resolved, 1);
        assert_eq!(ben.in_progress, 1);
        assert_eq!(ben.pending, 1);
        assert_eq!(ben.category_histogram.len(), 3);
    }

    #[test]
    fn status_counters_always_sum_to_reported() {
        let who = contributor("u-1", "Chidi");
        let statuses = [
            IssueStatus::Resolved,
            IssueStatus::Pending,
            IssueStatus::InProgress,
            IssueStatus::parse_lenient("rejected"),
            IssueStatus::Resolved,
        ];
        let records: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(&i.to_string(), Some(who.clone()), "road", *s, None))
            .collect();

        let acc = accumulate(&records);
        for agg in acc.contributors.values() {
            assert_eq!(agg.reported, agg.resolved + agg.in_progress + agg.pending);
        }
        assert_eq!(acc.contributors["u-1"].pending, 2);
    }

    #[test]
    fn anonymous_records_are_skipped_but_not_fatal() {
        let mut blank = contributor("", "Anonymous");
        blank.id = "  ".to_string();
        let records = vec![
            record("1", None, "road", IssueStatus::Resolved, None),
            record("2", Some(blank), "road", IssueStatus::Resolved, None),
            record("3", Some(contributor("u-1", "Dana")), "road", IssueStatus::Resolved, None),
        ];

        let acc = accumulate(&records);
        assert_eq!(acc.skipped_anonymous, 2);
        assert_eq!(acc.contributors.len(), 1);
        let reported: u64 = acc.contributors.values().map(|c| c.reported).sum();
        assert_eq!(reported, 1);
        let category_total: u64 = acc.categories.values().map(|c| c.total).sum();
        assert_eq!(category_total, 1);
    }

    #[test]
    fn sums_engagement_and_tracks_latest_activity() {
        let who = contributor("u-1", "Eve");
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let late = early + Duration::days(10);

        let mut first = record("1", Some(who.clone()), "water", IssueStatus::Resolved, Some(late));
        first.votes = 4;
        first.views = 100;
        let mut second = record("2", Some(who.clone()), "water", IssueStatus::Pending, Some(early));
        second.comments = 3;
        second.upvotes = 2;
        let third = record("3", Some(who), "water", IssueStatus::Pending, None);

        let acc = accumulate(&[first, second, third]);
        let agg = &acc.contributors["u-1"];
        assert_eq!(agg.total_votes, 4);
        assert_eq!(agg.total_comments, 3);
        assert_eq!(agg.total_upvotes, 2);
        assert_eq!(agg.total_views, 100);
        assert_eq!(agg.last_activity_at, Some(late));

        let water = acc.categories[&CategoryId::WaterSupply];
        assert_eq!(water.total, 3);
        assert_eq!(water.resolved, 1);
    }

    #[test]
    fn identity_comes_from_first_record() {
        let mut later = contributor("u-1", "Renamed");
        later.location = None;
        let records = vec![
            record("1", Some(contributor("u-1", "Original")), "road", IssueStatus::Pending, None),
            record("2", Some(later), "road", IssueStatus::Pending, None),
        ];

        let acc = accumulate(&records);
        assert_eq!(acc.contributors["u-1"].name, "Original");
        assert_eq!(acc.contributors["u-1"].location.as_deref(), Some("Ward 4"));
    }

    #[test]
    fn huge_counters_saturate_instead_of_overflowing() {
        let people = [contributor("u-1", "Ana"), contributor("u-2", "Ben")];
        let records: Vec<_> = (0..6)
            .map(|i| {
                let who = people[i % 2].clone();
                let status = IssueStatus::Resolved;
                let mut r = record(&i.to_string(), Some(who), "road", status, None);
                // Largest value a Postgres BIGINT or CSV export can carry.
                r.views = i64::MAX as u64;
                r.votes = u64::MAX;
                r
            })
            .collect();

        let acc = accumulate(&records);
        let agg = &acc.contributors["u-1"];
        assert_eq!(agg.total_views, u64::MAX);
        assert_eq!(agg.total_votes, u64::MAX);
        assert_eq!(agg.reported, 3);

        let snapshot = crate::engine::compute_snapshot(&records, chrono::Utc::now());
        assert_eq!(snapshot.contributors.len(), 2);
        assert_eq!(snapshot.contributors[0].impact_score, 100);
        assert_eq!(snapshot.contributors[0].points, u64::MAX);
        assert_eq!(snapshot.summary.total_points, u64::MAX);
        assert_eq!(snapshot.summary.total_reported, 6);
    }
}
