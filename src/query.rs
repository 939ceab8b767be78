use crate::errors::RequestError;
use crate::models::{CategoryId, ContributorAggregate, LeaderboardSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorFilter {
    pub search_text: Option<String>,
    /// `None` means "all".
    pub category: Option<CategoryId>,
}

impl ContributorFilter {
    /// Accepts the `"all"` sentinel (or an empty string) as no filter.
    pub fn parse_category(raw: Option<&str>) -> Result<Option<CategoryId>, RequestError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }

    fn matches(&self, contributor: &ContributorAggregate, needle: Option<&str>) -> bool {
        if let Some(needle) = needle {
            let hit = contributor.name.to_lowercase().contains(needle)
                || contributor
                    .location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(needle))
                || contributor.level.label().to_lowercase().contains(needle)
                || contributor.email.to_lowercase().contains(needle);
            if !hit {
                return false;
            }
        }

        match self.category {
            None => true,
            Some(category) => {
                contributor.top_category == Some(category)
                    || contributor
                        .category_histogram
                        .get(&category)
                        .is_some_and(|count| *count > 0)
            }
        }
    }
}

/// Filters the ranked list in place order. Ranks are the snapshot's, not
/// positions within the filtered result.
pub fn query<'a>(
    snapshot: &'a LeaderboardSnapshot,
    filter: &ContributorFilter,
) -> Vec<&'a ContributorAggregate> {
    let needle = filter
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    snapshot
        .contributors
        .iter()
        .filter(|c| filter.matches(c, needle.as_deref()))
        .collect()
}

pub fn top_n(snapshot: &LeaderboardSnapshot, n: usize) -> &[ContributorAggregate] {
    &snapshot.contributors[..n.min(snapshot.contributors.len())]
}
