//! # Travel Agent Library
//!
//! A hotel search assistant built on the Booking.com RapidAPI endpoints.
//! Searches one or more destinations, filters candidates against a total
//! budget, ranks them against free-text preferences (locally or through a
//! hosted language model) and caches remote lookups on disk.

pub mod assistant;
pub mod cache;
pub mod client;
pub mod config;
pub mod display;
pub mod llm;
pub mod ranking;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

// Re-export main types for convenience
pub use assistant::{BudgetFilter, DestinationReport, HotelSource, TravelAssistant};
pub use cache::Cache;
pub use client::{BookingClient, HotelResponseParser};
pub use config::{Config, RankingConfig};
pub use llm::{ChatBackend, LlmError, LlmRanker, OpenAiChat};
pub use ranking::{HotelRanker, PreferenceRanker, Ranking, RankingMethod, ScoredHotel};

/// Placeholder for fields the remote service left out or sent malformed
pub const UNKNOWN: &str = "unknown";

/// Error types for the travel agent library
#[derive(Error, Debug)]
pub enum TravelError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API request to {endpoint} returned status {status}")]
    ApiStatus { endpoint: String, status: u16 },

    #[error("Response parsing failed: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("{0} not found in environment variables")]
    MissingCredential(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Cache storage error: {0}")]
    CacheError(#[from] sled::Error),

    #[error("Language model error: {0}")]
    LanguageModelError(#[from] LlmError),

    #[error("Invalid ranking mode: {0}")]
    InvalidRankingMode(String),
}

/// Check-in / check-out pair for a stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDates {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
}

impl StayDates {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub fn new(checkin: NaiveDate, checkout: NaiveDate) -> Self {
        Self { checkin, checkout }
    }

    /// Parse optional YYYY-MM-DD dates, defaulting relative to the local date.
    ///
    /// Check-in defaults to tomorrow, check-out to the day after check-in.
    pub fn parse(checkin: Option<&str>, checkout: Option<&str>) -> Result<Self, TravelError> {
        Self::parse_from(checkin, checkout, Local::now().date_naive())
    }

    /// Same as [`StayDates::parse`] with an explicit "today"
    pub fn parse_from(
        checkin: Option<&str>,
        checkout: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, TravelError> {
        let checkin = match checkin {
            Some(s) => Self::parse_date(s)?,
            None => Self::next_day(today)?,
        };
        let checkout = match checkout {
            Some(s) => Self::parse_date(s)?,
            None => Self::next_day(checkin)?,
        };

        Ok(Self { checkin, checkout })
    }

    fn next_day(date: NaiveDate) -> Result<NaiveDate, TravelError> {
        date.checked_add_signed(Duration::days(1)).ok_or_else(|| {
            TravelError::DateParseError(format!("no day follows {}", date))
        })
    }

    fn parse_date(s: &str) -> Result<NaiveDate, TravelError> {
        NaiveDate::parse_from_str(s.trim(), Self::FORMAT).map_err(|_| {
            TravelError::DateParseError(format!("expected YYYY-MM-DD, got {}", s))
        })
    }

    /// Calendar nights between check-in and check-out; may be zero or negative
    pub fn nights(&self) -> i64 {
        (self.checkout - self.checkin).num_days()
    }

    /// Nights used for pricing; a degenerate range counts as one night
    pub fn billable_nights(&self) -> u32 {
        self.nights().clamp(1, u32::MAX as i64) as u32
    }

    pub fn checkin_str(&self) -> String {
        self.checkin.format(Self::FORMAT).to_string()
    }

    pub fn checkout_str(&self) -> String {
        self.checkout.format(Self::FORMAT).to_string()
    }
}

/// How a destination's candidates are ordered before rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    /// Language model when configured, otherwise the local heuristic
    Auto,
    Local,
    LanguageModel,
    /// Keep the filtered candidates in service order
    Off,
}

impl FromStr for RankingMode {
    type Err = TravelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RankingMode::Auto),
            "local" => Ok(RankingMode::Local),
            "llm" | "model" => Ok(RankingMode::LanguageModel),
            "none" | "off" => Ok(RankingMode::Off),
            _ => Err(TravelError::InvalidRankingMode(s.to_string())),
        }
    }
}

/// A complete multi-destination search request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub destinations: Vec<String>,
    pub dates: StayDates,
    pub adults: u32,
    pub rooms: u32,
    /// Total budget for the whole stay, all rooms included
    pub budget: Option<f64>,
    /// Comma-delimited free-text preferences
    pub preferences: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchQuery {
    /// Create a query for comma-separated destinations with 2 adults in 1 room
    pub fn new(destinations: &str, dates: StayDates) -> Self {
        Self {
            destinations: Self::split_destinations(destinations),
            dates,
            adults: 2,
            rooms: 1,
            budget: None,
            preferences: None,
            min_price: None,
            max_price: None,
        }
    }

    pub fn split_destinations(destinations: &str) -> Vec<String> {
        destinations
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Preferences with surrounding whitespace removed, `None` when blank
    pub fn preferences(&self) -> Option<&str> {
        self.preferences
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Destination resolved by the location-search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub dest_id: String,
    pub search_type: String,
    pub label: String,
}

/// Review information; `score` is `None` when missing or non-numeric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScore {
    pub score: Option<f64>,
    pub word: String,
    pub count: u64,
}

impl Default for ReviewScore {
    fn default() -> Self {
        Self {
            score: None,
            word: UNKNOWN.to_string(),
            count: 0,
        }
    }
}

/// Price for one stay; `per_night` is for a single room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub currency: String,
    pub per_night: Option<f64>,
    pub total: Option<f64>,
    pub nights: u32,
    pub rooms: u32,
}

impl PriceBreakdown {
    pub fn new(
        currency: impl Into<String>,
        per_night: Option<f64>,
        nights: u32,
        rooms: u32,
    ) -> Self {
        let total = per_night.map(|p| p * nights as f64 * rooms as f64);
        Self {
            currency: currency.into(),
            per_night,
            total,
            nights,
            rooms,
        }
    }
}

/// One entry of the hotel search list, before details are fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelSummary {
    pub id: String,
    pub name: String,
    pub review: ReviewScore,
    pub price: PriceBreakdown,
}

/// Payload of the hotel details endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelDetails {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub website: String,
    pub popular_facilities: Vec<String>,
    pub facilities: Vec<String>,
    pub family_facilities: Vec<String>,
}

impl HotelDetails {
    /// Details with every field set to its placeholder
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            address: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            website: UNKNOWN.to_string(),
            popular_facilities: Vec::new(),
            facilities: Vec::new(),
            family_facilities: Vec::new(),
        }
    }

    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// Normalized hotel candidate, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub id: String,
    pub name: String,
    pub review: ReviewScore,
    pub price: PriceBreakdown,
    pub address: String,
    pub location: String,
    pub website: String,
    pub popular_facilities: Vec<String>,
    pub facilities: Vec<String>,
}

impl HotelRecord {
    /// Merge a search entry with its details
    pub fn from_parts(summary: HotelSummary, details: HotelDetails) -> Self {
        let location = details.location();
        Self {
            id: summary.id,
            name: summary.name,
            review: summary.review,
            price: summary.price,
            address: details.address,
            location,
            website: details.website,
            popular_facilities: details.popular_facilities,
            facilities: details.facilities,
        }
    }

    /// Case-insensitive union of both facility lists
    pub fn facility_set(&self) -> BTreeSet<String> {
        self.popular_facilities
            .iter()
            .chain(self.facilities.iter())
            .map(|f| f.to_lowercase())
            .collect()
    }

    /// Review score, zero when unknown or not a finite number
    pub fn rating(&self) -> f64 {
        self.review.score.filter(|s| s.is_finite()).unwrap_or(0.0)
    }
}
