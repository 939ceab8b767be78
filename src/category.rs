use crate::models::CategoryId;

/// Ordered keyword rules. The first rule with any keyword contained in the
/// lowercased label wins, so labels naming several areas resolve to the
/// earliest rule.
const RULES: &[(&[&str], CategoryId)] = &[
    (&["road", "infrastructure"], CategoryId::RoadInfrastructure),
    (&["sanitation", "waste", "garbage"], CategoryId::SanitationWaste),
    (&["water"], CategoryId::WaterSupply),
    (&["electric"], CategoryId::Electricity),
    (&["security", "safety"], CategoryId::Security),
    (&["transport", "traffic", "parking"], CategoryId::Transport),
];

pub fn normalize(raw_category: &str) -> CategoryId {
    let label = raw_category.trim().to_lowercase();
    if label.is_empty() {
        return CategoryId::Other;
    }

    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| label.contains(keyword)))
        .map(|(_, category)| *category)
        .unwrap_or(CategoryId::Other)
}
