//! Knowledge sources — fast public reference data and the secure
//! financial store
//!
//! Both static sources ship in-crate reference datasets and score entries
//! by keyword overlap with the query. The secure source filters its own
//! records by the permitted tiers before matching; passing no tiers yields
//! no records.

use super::policy::Tier;
use super::KnowledgeResult;
use crate::error::Result;
use async_trait::async_trait;

/// A queryable knowledge backend
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Source name used in result envelopes and logs
    fn name(&self) -> &str;

    /// Up to `limit` records matching the query
    ///
    /// `permitted` bounds the confidentiality tiers a caller may see;
    /// sources without tier-tagged records ignore it.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        permitted: &[Tier],
    ) -> Result<Vec<KnowledgeResult>>;
}

struct Entry {
    id: &'static str,
    title: &'static str,
    content: &'static str,
    keywords: &'static [&'static str],
    confidence: f32,
    tier: Option<Tier>,
}

impl Entry {
    /// Keyword-overlap score; `None` when nothing matches
    fn score(&self, query: &str) -> Option<f32> {
        let query = query.to_lowercase();
        let matched = self
            .keywords
            .iter()
            .filter(|k| query.contains(&k.to_lowercase()))
            .count();
        if matched == 0 {
            return None;
        }
        let coverage = matched as f32 / self.keywords.len() as f32;
        Some((self.confidence * (0.7 + 0.3 * coverage)).min(1.0))
    }

    fn to_result(&self, source: &str, confidence: f32) -> KnowledgeResult {
        KnowledgeResult {
            id: self.id.to_string(),
            title: self.title.to_string(),
            content: self.content.to_string(),
            source: source.to_string(),
            confidence,
            latency_ms: 0,
            confidentiality: self.tier,
        }
    }
}

fn search_entries(
    entries: &[Entry],
    source: &str,
    query: &str,
    limit: usize,
    permitted: Option<&[Tier]>,
) -> Vec<KnowledgeResult> {
    let mut results: Vec<KnowledgeResult> = entries
        .iter()
        .filter(|e| match (permitted, e.tier) {
            // Tier-tagged entries require an explicit clearance
            (Some(tiers), Some(tier)) => tiers.contains(&tier),
            (Some(_), None) => false,
            (None, _) => true,
        })
        .filter_map(|e| e.score(query).map(|c| e.to_result(source, c)))
        .collect();

    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}

/// Fast public club reference data
pub struct StaticPublicSource {
    name: String,
}

const PUBLIC_ENTRIES: &[Entry] = &[
    Entry {
        id: "pub-history",
        title: "Club history",
        content: "Founded in 1902, the club has won four league titles and two domestic cups, \
                  most recently in 2011.",
        keywords: &["history", "founded", "titles", "honours", "club history"],
        confidence: 0.92,
        tier: None,
    },
    Entry {
        id: "pub-stadium",
        title: "Stadium",
        content: "Home matches are played at Riverside Park, capacity 31,400, opened in 1998 \
                  and expanded in 2014.",
        keywords: &["stadium", "ground", "capacity", "riverside"],
        confidence: 0.9,
        tier: None,
    },
    Entry {
        id: "pub-squad",
        title: "Squad overview",
        content: "The first-team squad counts 26 players across four position groups, with an \
                  average age of 25.3.",
        keywords: &["squad", "players", "roster", "first team"],
        confidence: 0.85,
        tier: None,
    },
    Entry {
        id: "pub-standing",
        title: "League standing",
        content: "The club currently sits 6th in the league with 41 points from 26 matches.",
        keywords: &["league", "standing", "table", "points", "position"],
        confidence: 0.88,
        tier: None,
    },
    Entry {
        id: "pub-fixtures",
        title: "Upcoming fixtures",
        content: "Next fixtures: home to Rovers on Saturday, away at Athletic the following \
                  Wednesday.",
        keywords: &["fixture", "fixtures", "match", "schedule", "next game"],
        confidence: 0.84,
        tier: None,
    },
    Entry {
        id: "pub-manager",
        title: "Manager profile",
        content: "The head coach joined in 2023 on a three-year deal after leading his previous \
                  side to promotion.",
        keywords: &["manager", "coach", "head coach"],
        confidence: 0.82,
        tier: None,
    },
    Entry {
        id: "pub-academy",
        title: "Academy",
        content: "The academy holds category-one status and has graduated nine first-team \
                  debutants since 2019.",
        keywords: &["academy", "youth", "development"],
        confidence: 0.8,
        tier: None,
    },
];

impl StaticPublicSource {
    pub fn new() -> Self {
        Self {
            name: "public-kb".to_string(),
        }
    }
}

impl Default for StaticPublicSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeSource for StaticPublicSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        _permitted: &[Tier],
    ) -> Result<Vec<KnowledgeResult>> {
        Ok(search_entries(PUBLIC_ENTRIES, &self.name, query, limit, None))
    }
}

/// Secure financial records, every entry tier-tagged
pub struct StaticSecureSource {
    name: String,
}

const SECURE_ENTRIES: &[Entry] = &[
    Entry {
        id: "sec-wage-bill",
        title: "Wage bill summary",
        content: "Total first-team wage bill is 48.2M per season, 62% of football revenue.",
        keywords: &["wage", "wage bill", "payroll", "earnings"],
        confidence: 0.9,
        tier: Some(Tier::Restricted),
    },
    Entry {
        id: "sec-salaries",
        title: "Player salary details",
        content: "Individual player salaries range from 4k to 85k per week; the top five \
                  earners account for 38% of the wage bill.",
        keywords: &["salary", "salaries", "wage", "earn", "pay"],
        confidence: 0.93,
        tier: Some(Tier::Confidential),
    },
    Entry {
        id: "sec-transfer-budget",
        title: "Transfer budget",
        content: "The board has approved a 22M transfer budget for the summer window, \
                  including 8M held back for wages.",
        keywords: &["transfer", "budget", "transfer fee", "window"],
        confidence: 0.88,
        tier: Some(Tier::Restricted),
    },
    Entry {
        id: "sec-contracts",
        title: "Contract expiry list",
        content: "Seven first-team contracts expire in 2025; renewal talks are open with \
                  three of them.",
        keywords: &["contract", "expiry", "renewal", "out of contract"],
        confidence: 0.9,
        tier: Some(Tier::Confidential),
    },
    Entry {
        id: "sec-release-clauses",
        title: "Release clauses",
        content: "Four players carry release clauses between 15M and 40M, two of which are \
                  active only for continental clubs.",
        keywords: &["release clause", "release", "clause", "buyout"],
        confidence: 0.92,
        tier: Some(Tier::Confidential),
    },
    Entry {
        id: "sec-termination",
        title: "Termination clauses",
        content: "Two senior contracts include termination clauses exercisable at the end of \
                  the season at 50% of remaining value.",
        keywords: &["termination clause", "termination", "clause"],
        confidence: 0.9,
        tier: Some(Tier::Secret),
    },
    Entry {
        id: "sec-agent-fees",
        title: "Agent fee agreements",
        content: "Agent fee commitments total 3.1M across the current squad, payable over \
                  contract duration.",
        keywords: &["agent fee", "agent", "fee", "intermediary"],
        confidence: 0.87,
        tier: Some(Tier::Secret),
    },
    Entry {
        id: "sec-bonuses",
        title: "Bonus structures",
        content: "Squad bonus structures cover appearance, goal and qualification triggers, \
                  capped at 6.5M per season.",
        keywords: &["bonus", "bonuses", "incentive"],
        confidence: 0.86,
        tier: Some(Tier::Confidential),
    },
];

impl StaticSecureSource {
    pub fn new() -> Self {
        Self {
            name: "secure-financial".to_string(),
        }
    }
}

impl Default for StaticSecureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeSource for StaticSecureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        permitted: &[Tier],
    ) -> Result<Vec<KnowledgeResult>> {
        Ok(search_entries(
            SECURE_ENTRIES,
            &self.name,
            query,
            limit,
            Some(permitted),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_public_source_matches_club_history() {
        let source = StaticPublicSource::new();
        let results = source.search("tell me about the club history", 5, &[]).await.unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].id, "pub-history");
        assert!(results[0].confidentiality.is_none());
    }

    #[tokio::test]
    async fn test_public_source_no_match_is_empty() {
        let source = StaticPublicSource::new();
        let results = source.search("qwerty asdf", 5, &[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_secure_source_respects_permitted_tiers() {
        let source = StaticSecureSource::new();

        // finance: restricted + confidential
        let results = source
            .search(
                "salary details",
                10,
                &[Tier::Restricted, Tier::Confidential],
            )
            .await
            .unwrap();
        assert!(results.iter().any(|r| r.id == "sec-salaries"));
        assert!(results
            .iter()
            .all(|r| r.confidentiality != Some(Tier::Secret)));
    }

    #[tokio::test]
    async fn test_secure_source_empty_tiers_yields_nothing() {
        let source = StaticSecureSource::new();
        let results = source.search("salary details", 10, &[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_secure_source_secret_tier_for_cleared_roles() {
        let source = StaticSecureSource::new();
        let results = source
            .search(
                "termination clause details",
                10,
                &[Tier::Restricted, Tier::Confidential, Tier::Secret],
            )
            .await
            .unwrap();
        assert!(results
            .iter()
            .any(|r| r.confidentiality == Some(Tier::Secret)));
    }

    #[tokio::test]
    async fn test_results_sorted_and_limited() {
        let source = StaticSecureSource::new();
        let results = source
            .search(
                "wage and salary and bonus",
                2,
                &[Tier::Restricted, Tier::Confidential, Tier::Secret],
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].confidence >= results[1].confidence);
    }
}
