use serde::Serialize;
use tracing::{info, warn};

use crate::record;
use crate::timestamp::parse_visit_count;

const KNOWN_HEADERS: [&str; 2] = ["URL,Date,Visit Count", "URL,Last Visited,Visit Count"];

/// Behavioral axes of the DISC model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    Dominance,
    Influence,
    Steadiness,
    Conscientiousness,
}

impl Axis {
    pub const ALL: [Axis; 4] = [
        Axis::Dominance,
        Axis::Influence,
        Axis::Steadiness,
        Axis::Conscientiousness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Axis::Dominance => "Dominance (D)",
            Axis::Influence => "Influence (I)",
            Axis::Steadiness => "Steadiness (S)",
            Axis::Conscientiousness => "Conscientiousness (C)",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Axis::Dominance => &[
                "investing.com",
                "tradingview.com",
                "bloomberg.com",
                "wsj.com",
                "forbes.com",
                "businessinsider.com",
                "cnbc.com",
                "reuters.com",
                "marketwatch.com",
                "financial",
                "stocks",
                "crypto",
                "leadership",
                "management",
                "strategy",
                "competition",
            ],
            Axis::Influence => &[
                "instagram.com",
                "x.com",
                "facebook.com",
                "tiktok.com",
                "linkedin.com",
                "social",
                "marketing",
                "networking",
                "influencer",
                "fashion",
                "entertainment",
                "celebrity",
                "events",
                "community",
                "trends",
            ],
            Axis::Steadiness => &[
                "pinterest.com",
                "web.whatsapp.com",
                "telegram.org",
                "allrecipes.com",
                "cooking",
                "gardening",
                "family",
                "home",
                "well-being",
                "meditation",
                "community",
                "support",
                "routine",
                "planning",
                "stability",
            ],
            Axis::Conscientiousness => &[
                "github.com",
                "stackoverflow.com",
                "scholar.google.com",
                "arxiv.org",
                "pypi.org",
                "docs.python.org",
                "medium.com",
                "wikipedia.org",
                "research",
                "analysis",
                "data",
                "science",
                "programming",
                "tutorial",
                "documentation",
                "learning",
                "how-to",
            ],
        }
    }

    pub fn interpretation(self) -> &'static str {
        match self {
            Axis::Dominance => {
                "Dominance (D): focused on results, action and competition. High scores suggest \
                 someone direct and assertive who seeks control over their environment. Shows up \
                 as financial news, business sites and productivity tools."
            }
            Axis::Influence => {
                "Influence (I): focused on social interaction, persuasion and optimism. High \
                 scores suggest an outgoing person who values recognition and collaboration. \
                 Shows up as social networks, marketing and trend sites."
            }
            Axis::Steadiness => {
                "Steadiness (S): focused on cooperation, consistency and support. People with \
                 this trait value security and stable relationships. Shows up as messaging apps, \
                 community forums and relaxing hobby sites."
            }
            Axis::Conscientiousness => {
                "Conscientiousness (C): focused on quality, precision and analysis. High scores \
                 suggest someone detail-oriented and systematic who seeks knowledge. Shows up as \
                 technical documentation, papers and learning sites."
            }
        }
    }

    fn matches(self, url: &str) -> bool {
        self.keywords().iter().any(|keyword| url.contains(keyword))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisScore {
    pub axis: Axis,
    pub percentage: f64,
}

/// Share of weighted visits per axis. Percentages sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub scores: Vec<AxisScore>,
}

impl Profile {
    pub fn percentage(&self, axis: Axis) -> f64 {
        self.scores
            .iter()
            .find(|score| score.axis == axis)
            .map_or(0.0, |score| score.percentage)
    }

    /// Scores from highest to lowest.
    pub fn ranked(&self) -> Vec<AxisScore> {
        let mut ranked = self.scores.clone();
        ranked.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
        ranked
    }
}

/// Scores a `URL,Date,Visit Count` table against the keyword lists.
///
/// Each row adds its visit count at most once per axis. Returns `None` when
/// no keyword matched anything.
pub fn classify(table_text: &str) -> Option<Profile> {
    let lines: Vec<&str> = table_text.trim().lines().collect();
    if lines.len() < 2 {
        return None;
    }

    if !KNOWN_HEADERS.contains(&lines[0].trim()) {
        warn!(
            action = "parse",
            component = "classifier",
            header = lines[0],
            "Unexpected table header"
        );
    }

    let mut totals = [0u64; 4];
    for (index, line) in lines.iter().enumerate().skip(1) {
        let Some(fields) = record::recover(line) else {
            warn!(
                action = "skip",
                component = "classifier",
                line_number = index + 1,
                "Line ignored, expected three fields"
            );
            continue;
        };

        let url = fields.url.to_lowercase();
        let visits = parse_visit_count(fields.visit_count).unwrap_or(0);
        for (total, axis) in totals.iter_mut().zip(Axis::ALL) {
            if axis.matches(&url) {
                *total = total.saturating_add(visits);
            }
        }
    }

    let grand_total: u64 = totals.iter().sum();
    if grand_total == 0 {
        info!(
            action = "complete",
            component = "classifier",
            "No profile keywords found"
        );
        return None;
    }

    let scores = Axis::ALL
        .iter()
        .zip(totals)
        .map(|(&axis, total)| AxisScore {
            axis,
            percentage: total as f64 / grand_total as f64 * 100.0,
        })
        .collect();

    Some(Profile { scores })
}
