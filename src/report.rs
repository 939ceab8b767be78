use std::fmt::Write;

use crate::models::LeaderboardSnapshot;
use crate::query;

pub fn build_report(snapshot: &LeaderboardSnapshot, top_n: usize, stale: bool) -> String {
    let mut output = String::new();
    let summary = &snapshot.summary;

    let _ = writeln!(output, "# Community Leaderboard Report");
    let _ = writeln!(
        output,
        "Generated {} from {} issue records",
        snapshot.generated_at.format("%Y-%m-%d %H:%M UTC"),
        snapshot.record_count
    );
    if stale {
        let _ = writeln!(
            output,
            "> Latest refresh failed; figures are from the snapshot above."
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Contributors: {}", summary.total_contributors);
    let _ = writeln!(
        output,
        "- Issues reported: {} ({} resolved)",
        summary.total_reported, summary.total_resolved
    );
    let _ = writeln!(output, "- Total points: {}", summary.total_points);
    let _ = writeln!(
        output,
        "- Average resolution rate: {:.1}%",
        summary.avg_resolution_rate
    );
    let _ = writeln!(
        output,
        "- Average engagement score: {:.1}",
        summary.avg_engagement_score
    );
    let _ = writeln!(
        output,
        "- Active in last 30 days: {}",
        summary.active_in_last_30_days
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Contributors");

    let top = query::top_n(snapshot, top_n);
    if top.is_empty() {
        let _ = writeln!(output, "No contributors yet.");
    } else {
        let _ = writeln!(
            output,
            "| Rank | Name | Level | Points | Impact | Reported | Resolved | Top category |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
        for c in top {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                c.rank,
                c.name,
                c.level,
                c.points,
                c.impact_score,
                c.reported,
                c.resolved,
                c.top_category.map_or("-", |category| category.label())
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Distribution");

    if snapshot.category_distribution.is_empty() {
        let _ = writeln!(output, "No categorised issues.");
    } else {
        for row in &snapshot.category_distribution {
            let _ = writeln!(
                output,
                "- {}: {} issues, {} resolved ({:.1}%)",
                row.label, row.total, row.resolved, row.resolution_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");

    for bucket in &snapshot.trends {
        let _ = writeln!(
            output,
            "- {}: {} reported, {} resolved, {} active contributors",
            bucket.month_label, bucket.reported, bucket.resolved, bucket.active_contributor_count
        );
    }

    output
}
