use chrono::{DateTime, Utc};

use crate::models::{CategoryId, ContributorAggregate, Level};

const VOTE_WEIGHT: f64 = 0.3;
const COMMENT_WEIGHT: f64 = 0.4;
const UPVOTE_WEIGHT: f64 = 0.2;
const VIEW_WEIGHT: f64 = 0.1;
const CATEGORY_BONUS_PER_ISSUE: u64 = 5;

/// Fills every derived field except `rank`.
pub fn score(aggregate: ContributorAggregate, now: DateTime<Utc>) -> ContributorAggregate {
    let resolution_rate = resolution_rate(aggregate.resolved, aggregate.reported);
    let engagement_score = engagement_score(&aggregate);
    let points = points(&aggregate, engagement_score, resolution_rate);
    let impact_score = impact_score(&aggregate, engagement_score);

    ContributorAggregate {
        resolution_rate,
        engagement_score,
        points,
        impact_score,
        level: level_for(points),
        top_category: top_category(&aggregate),
        streak_days: streak_days(aggregate.last_activity_at, now),
        ..aggregate
    }
}

pub fn resolution_rate(resolved: u64, reported: u64) -> f64 {
    if reported == 0 {
        return 0.0;
    }
    resolved as f64 / reported as f64 * 100.0
}

pub fn engagement_score(aggregate: &ContributorAggregate) -> f64 {
    aggregate.total_votes as f64 * VOTE_WEIGHT
        + aggregate.total_comments as f64 * COMMENT_WEIGHT
        + aggregate.total_upvotes as f64 * UPVOTE_WEIGHT
        + aggregate.total_views as f64 * VIEW_WEIGHT
}

fn points(aggregate: &ContributorAggregate, engagement_score: f64, resolution_rate: f64) -> u64 {
    let category_bonus: u64 = aggregate
        .category_histogram
        .values()
        .map(|count| count.saturating_mul(CATEGORY_BONUS_PER_ISSUE))
        .fold(0, u64::saturating_add);

    let raw = aggregate.reported as f64 * 10.0
        + aggregate.resolved as f64 * 20.0
        + engagement_score * 1.5
        + resolution_rate * 0.5
        + category_bonus as f64;
    raw.round() as u64
}

fn impact_score(aggregate: &ContributorAggregate, engagement_score: f64) -> u64 {
    let efficiency = aggregate.resolved as f64 * 30.0 / aggregate.reported.max(1) as f64;
    let breadth = aggregate.category_histogram.len() as f64 * 10.0;
    let raw = (efficiency + engagement_score / 5.0 + breadth).round() as u64;
    raw.min(100)
}

pub fn level_for(points: u64) -> Level {
    match points {
        5000.. => Level::Legend,
        2000.. => Level::Expert,
        1000.. => Level::Advanced,
        500.. => Level::Intermediate,
        100.. => Level::Beginner,
        _ => Level::Newcomer,
    }
}

/// Highest histogram count; ties go to the category seen first.
pub fn top_category(aggregate: &ContributorAggregate) -> Option<CategoryId> {
    let mut best: Option<(CategoryId, u64)> = None;
    for (category, count) in &aggregate.category_histogram {
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((*category, *count)),
        }
    }
    best.map(|(category, _)| category)
}

/// Coarse recency band, not a consecutive-day count.
pub fn streak_days(last_activity_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(last) = last_activity_at else {
        return 0;
    };
    match (now - last).num_days().max(0) {
        0 => 7,
        1..=3 => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::accumulate::fixtures::contributor;

    fn aggregate() -> ContributorAggregate {
        ContributorAggregate::from_ref(&contributor("u-1", "Fola Adeyemi"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn resolution_rate_is_percentage_and_guarded() {
        assert_eq!(resolution_rate(4, 10), 40.0);
        assert_eq!(resolution_rate(0, 0), 0.0);
        assert_eq!(resolution_rate(3, 3), 100.0);
    }

    #[test]
    fn points_follow_weighted_formula() {
        let mut agg = aggregate();
        agg.reported = 10;
        agg.resolved = 4;
        agg.pending = 6;
        agg.total_votes = 10;
        agg.total_comments = 5;
        agg.total_upvotes = 5;
        agg.total_views = 20;
        agg.category_histogram.insert(CategoryId::RoadInfrastructure, 7);
        agg.category_histogram.insert(CategoryId::WaterSupply, 3);

        let scored = score(agg, now());
        // engagement = 3 + 2 + 1 + 2 = 8
        assert!((scored.engagement_score - 8.0).abs() < 1e-9);
        assert_eq!(scored.resolution_rate, 40.0);
        // 100 + 80 + 12 + 20 + 50
        assert_eq!(scored.points, 262);
        // 12 + 1.6 + 20 = 33.6
        assert_eq!(scored.impact_score, 34);
        assert_eq!(scored.level, Level::Beginner);
        assert_eq!(scored.top_category, Some(CategoryId::RoadInfrastructure));
    }

    #[test]
    fn impact_score_is_capped_at_100() {
        let mut agg = aggregate();
        agg.reported = 2;
        agg.resolved = 2;
        agg.total_views = 10_000;
        for category in CategoryId::ALL {
            agg.category_histogram.insert(category, 1);
        }
        let scored = score(agg, now());
        assert_eq!(scored.impact_score, 100);
        assert!(scored.resolution_rate <= 100.0);
    }

    #[test]
    fn level_thresholds_are_inclusive() {
        assert_eq!(level_for(0), Level::Newcomer);
        assert_eq!(level_for(99), Level::Newcomer);
        assert_eq!(level_for(100), Level::Beginner);
        assert_eq!(level_for(500), Level::Intermediate);
        assert_eq!(level_for(1000), Level::Advanced);
        assert_eq!(level_for(1999), Level::Advanced);
        assert_eq!(level_for(2000), Level::Expert);
        assert_eq!(level_for(5000), Level::Legend);
    }

    #[test]
    fn top_category_ties_go_to_first_seen() {
        let mut agg = aggregate();
        agg.category_histogram.insert(CategoryId::Transport, 2);
        agg.category_histogram.insert(CategoryId::Electricity, 2);
        agg.category_histogram.insert(CategoryId::Other, 1);
        assert_eq!(top_category(&agg), Some(CategoryId::Transport));

        assert_eq!(top_category(&aggregate()), None);
    }

    #[test]
    fn streak_follows_recency_bands() {
        let now = now();
        assert_eq!(streak_days(None, now), 0);
        assert_eq!(streak_days(Some(now - Duration::hours(5)), now), 7);
        assert_eq!(streak_days(Some(now - Duration::days(1)), now), 3);
        assert_eq!(streak_days(Some(now - Duration::days(3)), now), 3);
        assert_eq!(streak_days(Some(now - Duration::days(4)), now), 1);
        assert_eq!(streak_days(Some(now + Duration::days(2)), now), 7);
    }

    #[test]
    fn empty_aggregate_scores_to_zero() {
        let scored = score(aggregate(), now());
        assert_eq!(scored.points, 0);
        assert_eq!(scored.impact_score, 0);
        assert_eq!(scored.resolution_rate, 0.0);
        assert_eq!(scored.level, Level::Newcomer);
        assert_eq!(scored.streak_days, 0);
    }
}
