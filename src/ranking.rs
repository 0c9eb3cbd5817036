//! Preference-based hotel ranking

use crate::config::RankingConfig;
use crate::HotelRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A hotel together with the score it was ranked by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHotel {
    pub hotel: HotelRecord,
    pub score: f64,
}

/// Which ranker produced an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMethod {
    Preference,
    LanguageModel,
    Unranked,
}

/// Ordered result of a ranking pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub method: RankingMethod,
    pub hotels: Vec<ScoredHotel>,
}

/// Reduces a destination's candidates to an ordered shortlist.
///
/// Implementations must always return a usable ordering; failures of any
/// remote collaborator are handled inside the ranker.
#[async_trait]
pub trait HotelRanker: Send + Sync {
    async fn rank(&self, hotels: Vec<HotelRecord>, preferences: Option<&str>) -> Ranking;
}

/// Split a comma-delimited preference string into lowercase tokens
pub fn preference_tokens(preferences: Option<&str>) -> Vec<String> {
    preferences
        .map(|p| {
            p.split(',')
                .map(|token| token.trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Local heuristic blending review score with facility matches.
///
/// `total = rating * rating_weight + preference_score * preference_weight`
/// where `preference_score` is the fraction of preference tokens found as a
/// substring of some facility, scaled to 0-5.
#[derive(Debug, Clone, Default)]
pub struct PreferenceRanker {
    config: RankingConfig,
}

impl PreferenceRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn score(&self, hotel: &HotelRecord, preferences: Option<&str>) -> f64 {
        self.score_tokens(hotel, &preference_tokens(preferences))
    }

    fn score_tokens(&self, hotel: &HotelRecord, tokens: &[String]) -> f64 {
        let preference_score = if tokens.is_empty() {
            0.0
        } else {
            let facilities = hotel.facility_set();
            let matches = tokens
                .iter()
                .filter(|token| facilities.iter().any(|f| f.contains(token.as_str())))
                .count();
            matches as f64 / tokens.len() as f64 * 5.0
        };

        hotel.rating() * self.config.rating_weight
            + preference_score * self.config.preference_weight
    }

    /// Top `top_n` hotels, highest score first; ties keep input order
    pub fn rank_hotels(
        &self,
        hotels: Vec<HotelRecord>,
        preferences: Option<&str>,
    ) -> Vec<ScoredHotel> {
        let tokens = preference_tokens(preferences);

        let mut scored: Vec<ScoredHotel> = hotels
            .into_iter()
            .map(|hotel| {
                let score = self.score_tokens(&hotel, &tokens);
                ScoredHotel { hotel, score }
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.config.top_n);
        scored
    }
}

#[async_trait]
impl HotelRanker for PreferenceRanker {
    async fn rank(&self, hotels: Vec<HotelRecord>, preferences: Option<&str>) -> Ranking {
        Ranking {
            method: RankingMethod::Preference,
            hotels: self.rank_hotels(hotels, preferences),
        }
    }
}
