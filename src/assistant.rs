//! Search pipeline: destination lookup, hotel search, budget filter,
//! detail enrichment and ranking, one destination at a time.

use crate::cache::Cache;
use crate::client::BookingClient;
use crate::config::{cache_ttl, Config};
use crate::llm::{LlmRanker, OpenAiChat};
use crate::ranking::{HotelRanker, PreferenceRanker, Ranking, RankingMethod, ScoredHotel};
use crate::{
    Destination, HotelDetails, HotelRecord, HotelSummary, PriceBreakdown, RankingMode, SearchQuery,
    StayDates, TravelError,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Remote source of destinations, hotel lists and hotel details
#[async_trait]
pub trait HotelSource: Send + Sync {
    async fn resolve_destination(&self, query: &str) -> Result<Option<Destination>, TravelError>;

    async fn search_hotels(
        &self,
        destination: &Destination,
        query: &SearchQuery,
    ) -> Result<Vec<HotelSummary>, TravelError>;

    async fn hotel_details(
        &self,
        hotel_id: &str,
        dates: &StayDates,
    ) -> Result<Option<HotelDetails>, TravelError>;
}

/// Excludes hotels whose stay price exceeds a total budget.
///
/// The budget covers the whole stay for all rooms. A hotel's stay price is
/// `per_night * nights * rooms`, where `per_night` is the quoted nightly
/// price of one room. Hotels without a usable price are kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetFilter {
    pub budget: f64,
    pub nights: i64,
    pub rooms: u32,
}

impl BudgetFilter {
    pub fn new(budget: f64, dates: &StayDates, rooms: u32) -> Self {
        Self {
            budget,
            nights: dates.nights(),
            rooms,
        }
    }

    /// Budget spread over the nights; the whole budget for a degenerate range
    pub fn per_night_budget(&self) -> f64 {
        if self.nights > 0 {
            self.budget / self.nights as f64
        } else {
            self.budget
        }
    }

    pub fn stay_price(&self, per_night: f64) -> f64 {
        per_night * self.nights.max(1) as f64 * self.rooms as f64
    }

    pub fn admits(&self, price: &PriceBreakdown) -> bool {
        match price.per_night {
            Some(per_night) => self.stay_price(per_night) <= self.budget,
            None => true,
        }
    }
}

/// Outcome of searching a single destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationReport {
    pub destination: String,
    pub resolved: Option<Destination>,
    /// Hotels returned by the search, before the budget filter
    pub candidates_found: usize,
    pub within_budget: usize,
    pub ranking: Ranking,
    /// Non-fatal problems met along the way
    pub warnings: Vec<String>,
}

impl DestinationReport {
    fn empty(destination: &str, resolved: Option<Destination>, warning: String) -> Self {
        Self {
            destination: destination.to_string(),
            resolved,
            candidates_found: 0,
            within_budget: 0,
            ranking: Ranking {
                method: RankingMethod::Unranked,
                hotels: Vec::new(),
            },
            warnings: vec![warning],
        }
    }

    pub fn hotels(&self) -> impl Iterator<Item = &HotelRecord> {
        self.ranking.hotels.iter().map(|s| &s.hotel)
    }
}

/// Runs searches against a [`HotelSource`], with optional caching and ranking
pub struct TravelAssistant {
    source: Box<dyn HotelSource>,
    ranker: Option<Box<dyn HotelRanker>>,
    scorer: PreferenceRanker,
    cache: Option<Cache>,
}

impl TravelAssistant {
    /// Assistant without cache that ranks with `ranker`
    pub fn new(source: Box<dyn HotelSource>, ranker: Box<dyn HotelRanker>) -> Self {
        Self {
            source,
            ranker: Some(ranker),
            scorer: PreferenceRanker::default(),
            cache: None,
        }
    }

    /// Assistant that returns every filtered candidate in source order
    pub fn unranked(source: Box<dyn HotelSource>) -> Self {
        Self {
            source,
            ranker: None,
            scorer: PreferenceRanker::default(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Wire up the booking client, on-disk cache and ranker from configuration
    pub fn from_config(config: &Config, mode: RankingMode) -> Result<Self, TravelError> {
        let source = Box::new(BookingClient::from_config(config)?);
        let local = PreferenceRanker::new(config.ranking.clone());

        let ranker: Option<Box<dyn HotelRanker>> = match (mode, &config.openai) {
            (RankingMode::Off, _) => None,
            (RankingMode::Local, _) | (RankingMode::Auto, None) => Some(Box::new(local.clone())),
            (RankingMode::LanguageModel, None) => {
                return Err(TravelError::ConfigError(
                    "OPENAI_API_KEY is required for language model ranking".to_string(),
                ))
            }
            (RankingMode::LanguageModel, Some(openai)) | (RankingMode::Auto, Some(openai)) => {
                let chat = OpenAiChat::new(openai)?;
                Some(Box::new(LlmRanker::new(Box::new(chat), config.ranking.clone())?))
            }
        };

        let ttl = cache_ttl(config.cache_ttl_hours)?;
        let cache = Cache::open(&config.cache_path)?.with_ttl(ttl);

        Ok(Self {
            source,
            ranker,
            scorer: local,
            cache: Some(cache),
        })
    }

    /// Search every destination of the query, sequentially
    pub async fn search(&self, query: &SearchQuery) -> Vec<DestinationReport> {
        let mut reports = Vec::with_capacity(query.destinations.len());
        for destination in &query.destinations {
            reports.push(self.search_destination(destination, query).await);
        }
        reports
    }

    #[instrument(level = "info", skip(self, query))]
    pub async fn search_destination(
        &self,
        destination: &str,
        query: &SearchQuery,
    ) -> DestinationReport {
        let resolved = match self.lookup_destination(destination).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                return DestinationReport::empty(
                    destination,
                    None,
                    format!("No destination found for: {}", destination),
                )
            }
            Err(e) => {
                warn!(error = %e, "Destination lookup failed");
                return DestinationReport::empty(
                    destination,
                    None,
                    format!("Error searching destination: {}", e),
                );
            }
        };

        let summaries = match self.lookup_hotels(&resolved, query).await {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(error = %e, "Hotel search failed");
                return DestinationReport::empty(
                    destination,
                    Some(resolved),
                    format!("Error searching hotels: {}", e),
                );
            }
        };

        let candidates_found = summaries.len();
        let summaries: Vec<HotelSummary> = match query.budget {
            Some(budget) => {
                let filter = BudgetFilter::new(budget, &query.dates, query.rooms);
                debug!(
                    budget = budget,
                    per_night_budget = filter.per_night_budget(),
                    "Applying budget filter"
                );
                summaries.into_iter().filter(|s| filter.admits(&s.price)).collect()
            }
            None => summaries,
        };
        let within_budget = summaries.len();

        let mut warnings = Vec::new();
        let mut missing_details = 0;
        let mut hotels = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let details = match self.lookup_details(&summary.id, &query.dates).await {
                Some(details) => details,
                None => {
                    missing_details += 1;
                    HotelDetails::unknown()
                }
            };
            hotels.push(HotelRecord::from_parts(summary, details));
        }
        if missing_details > 0 {
            warnings.push(format!("Details unavailable for {} hotel(s)", missing_details));
        }

        let preferences = query.preferences();
        let ranking = match &self.ranker {
            Some(ranker) => ranker.rank(hotels, preferences).await,
            None => Ranking {
                method: RankingMethod::Unranked,
                hotels: hotels
                    .into_iter()
                    .map(|hotel| {
                        let score = self.scorer.score(&hotel, preferences);
                        ScoredHotel { hotel, score }
                    })
                    .collect(),
            },
        };

        info!(
            candidates_found = candidates_found,
            within_budget = within_budget,
            returned = ranking.hotels.len(),
            method = ?ranking.method,
            "Destination search completed"
        );

        DestinationReport {
            destination: destination.to_string(),
            resolved: Some(resolved),
            candidates_found,
            within_budget,
            ranking,
            warnings,
        }
    }

    /// Details for one hotel, `None` when unavailable
    pub async fn hotel_details(&self, hotel_id: &str, dates: &StayDates) -> Option<HotelDetails> {
        self.lookup_details(hotel_id, dates).await
    }

    async fn lookup_destination(&self, name: &str) -> Result<Option<Destination>, TravelError> {
        let key = format!("destination:{}", name.trim().to_lowercase());
        if let Some(destination) = self.cached(&key) {
            return Ok(Some(destination));
        }

        let destination = self.source.resolve_destination(name).await?;
        if let Some(ref destination) = destination {
            self.store(&key, destination);
        }
        Ok(destination)
    }

    async fn lookup_hotels(
        &self,
        destination: &Destination,
        query: &SearchQuery,
    ) -> Result<Vec<HotelSummary>, TravelError> {
        let key = format!(
            "search:{}:{}:{}:{}:{}:{}:{}",
            destination.dest_id,
            query.dates.checkin_str(),
            query.dates.checkout_str(),
            query.adults,
            query.rooms,
            query.min_price.map(|p| p.to_string()).unwrap_or_default(),
            query.max_price.map(|p| p.to_string()).unwrap_or_default(),
        );
        if let Some(hotels) = self.cached(&key) {
            return Ok(hotels);
        }

        let hotels = self.source.search_hotels(destination, query).await?;
        if !hotels.is_empty() {
            self.store(&key, &hotels);
        }
        Ok(hotels)
    }

    async fn lookup_details(&self, hotel_id: &str, dates: &StayDates) -> Option<HotelDetails> {
        let key = format!("details:{}:{}:{}", hotel_id, dates.checkin_str(), dates.checkout_str());
        if let Some(details) = self.cached(&key) {
            return Some(details);
        }

        match self.source.hotel_details(hotel_id, dates).await {
            Ok(Some(details)) => {
                self.store(&key, &details);
                Some(details)
            }
            Ok(None) => {
                warn!(hotel_id = hotel_id, "No details found for hotel");
                None
            }
            Err(e) => {
                warn!(hotel_id = hotel_id, error = %e, "Error fetching hotel details");
                None
            }
        }
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed");
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, value) {
                warn!(key = key, error = %e, "Cache write failed");
            }
        }
    }
}
