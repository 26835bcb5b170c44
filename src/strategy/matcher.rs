//! Lexical cross-catalog matcher.
//!
//! Pairs each internal condition with its best-matching external market by
//! Jaccard overlap of filtered token sets. Deterministic and pure: the scan
//! reads only immutable inputs, so per-condition work can be fanned out
//! across workers without locking.

use crate::config::config::MatchingCfg;
use crate::core::types::{Condition, Market, MatchResult, MatchTag};
use crate::strategy::tokenization::token_set;
use std::collections::HashSet;

pub struct Matcher {
    threshold: f64,
    min_token_len: usize,
}

impl Matcher {
    pub fn new(cfg: &MatchingCfg) -> Self {
        Self {
            threshold: cfg.similarity_threshold,
            min_token_len: cfg.min_token_len,
        }
    }

    /// Jaccard index of two token sets. Defined as 0 when the union is
    /// empty (not NaN).
    pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        let intersection = a.intersection(b).count();
        let union = a.union(b).count();
        intersection as f64 / union as f64
    }

    /// Produces exactly one result per condition. Matched results come
    /// first, sorted by descending similarity; unmatched results follow in
    /// input order.
    pub fn match_all(&self, conditions: &[Condition], markets: &[Market]) -> Vec<MatchResult> {
        let market_tokens: Vec<HashSet<String>> = markets
            .iter()
            .map(|m| token_set(&m.title, self.min_token_len))
            .collect();

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        for condition in conditions {
            let result = self.match_one(condition, markets, &market_tokens);
            if result.market.is_some() {
                matched.push(result);
            } else {
                unmatched.push(result);
            }
        }

        matched.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matched.extend(unmatched);
        matched
    }

    fn match_one(
        &self,
        condition: &Condition,
        markets: &[Market],
        market_tokens: &[HashSet<String>],
    ) -> MatchResult {
        let condition_tokens = token_set(&condition.question, self.min_token_len);

        // Argmax over the full candidate set. Ties keep the first candidate
        // encountered, stable over input iteration order.
        let mut best: Option<(usize, f64)> = None;
        for (i, tokens) in market_tokens.iter().enumerate() {
            let sim = Self::jaccard(&condition_tokens, tokens);
            if best.map_or(true, |(_, best_sim)| sim > best_sim) {
                best = Some((i, sim));
            }
        }

        match best {
            Some((i, sim)) if sim >= self.threshold => {
                let market = &markets[i];
                let tag = self.tag_for(sim);
                let analysis = match tag {
                    MatchTag::StrongOpportunity => format!(
                        "High lexical overlap with {} market \"{}\"; very likely the same event.",
                        market.platform, market.title
                    ),
                    MatchTag::InvestigateFurther => format!(
                        "Moderate overlap with {} market \"{}\"; worth a closer look.",
                        market.platform, market.title
                    ),
                    _ => format!(
                        "Shares wording with {} market \"{}\" but may be a related, not identical, proposition.",
                        market.platform, market.title
                    ),
                };
                MatchResult {
                    condition: condition.clone(),
                    market: Some(market.clone()),
                    similarity: sim,
                    analysis,
                    tag,
                }
            }
            _ => MatchResult {
                condition: condition.clone(),
                market: None,
                similarity: 0.0,
                analysis: "No external market matched above the similarity threshold.".to_string(),
                tag: MatchTag::UniqueMarket,
            },
        }
    }

    fn tag_for(&self, similarity: f64) -> MatchTag {
        if similarity > 0.7 {
            MatchTag::StrongOpportunity
        } else if similarity > 0.5 {
            MatchTag::InvestigateFurther
        } else {
            MatchTag::RelatedMarket
        }
    }
}
