use serde::Serialize;

use crate::models::ContributorAggregate;

/// Stable sort by points, highest first, then `rank = position + 1`.
/// Equal points keep their incoming order.
pub fn rank(mut aggregates: Vec<ContributorAggregate>) -> Vec<ContributorAggregate> {
    aggregates.sort_by(|a, b| b.points.cmp(&a.points));
    for (index, aggregate) in aggregates.iter_mut().enumerate() {
        aggregate.rank = index + 1;
    }
    aggregates
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankLookup<'a> {
    pub contributor: &'a ContributorAggregate,
    pub rank: usize,
    pub in_top: bool,
}

/// Looks in the published top-N first, then scans the whole ranked list so
/// contributors below the cut still get their real position. `None` means
/// the id never appeared in the input.
pub fn find_rank<'a>(
    contributor_id: &str,
    ranked: &'a [ContributorAggregate],
    top_n: usize,
) -> Option<RankLookup<'a>> {
    let top = &ranked[..top_n.min(ranked.len())];
    if let Some(position) = top.iter().position(|c| c.id == contributor_id) {
        return Some(RankLookup {
            contributor: &top[position],
            rank: position + 1,
            in_top: true,
        });
    }

    ranked
        .iter()
        .position(|c| c.id == contributor_id)
        .map(|position| RankLookup {
            contributor: &ranked[position],
            rank: position + 1,
            in_top: false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::fixtures::contributor;

    fn with_points(id: &str, points: u64) -> ContributorAggregate {
        let mut agg = ContributorAggregate::from_ref(&contributor(id, id));
        agg.points = points;
        agg
    }

    #[test]
    fn ties_preserve_first_seen_order() {
        let ranked = rank(vec![
            with_points("a", 50),
            with_points("b", 200),
            with_points("c", 200),
        ]);
        let ranks: Vec<(&str, usize)> = ranked.iter().map(|c| (c.id.as_str(), c.rank)).collect();
        assert_eq!(ranks, vec![("b", 1), ("c", 2), ("a", 3)]);
    }

    #[test]
    fn ranks_are_dense_and_start_at_one() {
        let ranked = rank((0..25).map(|i| with_points(&format!("u{i}"), i % 7)).collect());
        for (index, c) in ranked.iter().enumerate() {
            assert_eq!(c.rank, index + 1);
        }
        assert!(ranked.windows(2).all(|w| w[0].points >= w[1].points));
    }

    #[test]
    fn reranking_is_idempotent() {
        let once = rank(vec![
            with_points("a", 10),
            with_points("b", 30),
            with_points("c", 30),
            with_points("d", 0),
        ]);
        let twice = rank(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn find_rank_reaches_beyond_top_n() {
        let ranked = rank((0..10).map(|i| with_points(&format!("u{i}"), 100 - i)).collect());

        let top = find_rank("u1", &ranked, 3).unwrap();
        assert_eq!(top.rank, 2);
        assert!(top.in_top);

        let below = find_rank("u8", &ranked, 3).unwrap();
        assert_eq!(below.rank, 9);
        assert!(!below.in_top);
        assert_eq!(below.contributor.id, "u8");

        assert!(find_rank("ghost", &ranked, 3).is_none());
        assert!(find_rank("u0", &[], 50).is_none());
    }

    #[test]
    fn top_n_larger_than_list_is_fine() {
        let ranked = rank(vec![with_points("solo", 5)]);
        let hit = find_rank("solo", &ranked, 50).unwrap();
        assert_eq!(hit.rank, 1);
        assert!(hit.in_top);
    }
}
