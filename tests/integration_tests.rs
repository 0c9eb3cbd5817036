//! Integration tests for travel-agent
//!
//! The pipeline is driven through in-memory sources so these run offline.
//! `test_live_paris_search` hits the real API and only runs when
//! `RAPIDAPI_KEY` is set.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use travel_agent::ranking::RankingMethod;
use travel_agent::{
    BookingClient, Cache, ChatBackend, Destination, HotelDetails, HotelSource, HotelSummary,
    LlmError, LlmRanker, PreferenceRanker, PriceBreakdown, RankingConfig, ReviewScore, SearchQuery,
    StayDates, TravelAssistant, TravelError, UNKNOWN,
};

#[derive(Default)]
struct CallCounts {
    destinations: AtomicUsize,
    searches: AtomicUsize,
    details: AtomicUsize,
}

/// In-memory hotel source
struct FakeSource {
    destinations: HashMap<String, Destination>,
    hotels: HashMap<String, Vec<HotelSummary>>,
    details: HashMap<String, HotelDetails>,
    failing_searches: Vec<String>,
    calls: Arc<CallCounts>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            destinations: HashMap::new(),
            hotels: HashMap::new(),
            details: HashMap::new(),
            failing_searches: Vec::new(),
            calls: Arc::new(CallCounts::default()),
        }
    }

    fn with_destination(
        mut self,
        name: &str,
        dest_id: &str,
        hotels: Vec<(HotelSummary, Option<HotelDetails>)>,
    ) -> Self {
        self.destinations.insert(
            name.to_lowercase(),
            Destination {
                dest_id: dest_id.to_string(),
                search_type: "CITY".to_string(),
                label: name.to_string(),
            },
        );
        let mut summaries = Vec::new();
        for (summary, details) in hotels {
            if let Some(details) = details {
                self.details.insert(summary.id.clone(), details);
            }
            summaries.push(summary);
        }
        self.hotels.insert(dest_id.to_string(), summaries);
        self
    }
}

#[async_trait]
impl HotelSource for FakeSource {
    async fn resolve_destination(&self, query: &str) -> Result<Option<Destination>, TravelError> {
        self.calls.destinations.fetch_add(1, Ordering::SeqCst);
        Ok(self.destinations.get(&query.to_lowercase()).cloned())
    }

    async fn search_hotels(
        &self,
        destination: &Destination,
        _query: &SearchQuery,
    ) -> Result<Vec<HotelSummary>, TravelError> {
        self.calls.searches.fetch_add(1, Ordering::SeqCst);
        if self.failing_searches.contains(&destination.dest_id) {
            return Err(TravelError::ApiStatus {
                endpoint: "hotels/searchHotels".to_string(),
                status: 503,
            });
        }
        Ok(self.hotels.get(&destination.dest_id).cloned().unwrap_or_default())
    }

    async fn hotel_details(
        &self,
        hotel_id: &str,
        _dates: &StayDates,
    ) -> Result<Option<HotelDetails>, TravelError> {
        self.calls.details.fetch_add(1, Ordering::SeqCst);
        match self.details.get(hotel_id) {
            Some(details) => Ok(Some(details.clone())),
            None => Err(TravelError::ParseError(format!("no details for {}", hotel_id))),
        }
    }
}

struct FailingChat;

#[async_trait]
impl ChatBackend for FailingChat {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::StatusError {
            status: 500,
            body: "upstream error".to_string(),
        })
    }
}

/// Three-night stay for two rooms
fn stay() -> StayDates {
    StayDates::new(
        NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        NaiveDate::from_ymd_opt(2025, 8, 18).unwrap(),
    )
}

fn summary(id: &str, score: Option<f64>, per_night: Option<f64>) -> HotelSummary {
    HotelSummary {
        id: id.to_string(),
        name: format!("Hotel {}", id),
        review: ReviewScore {
            score,
            word: "Good".to_string(),
            count: 100,
        },
        price: PriceBreakdown::new("USD", per_night, 3, 2),
    }
}

fn details(city: &str, popular: &[&str]) -> HotelDetails {
    let mut details = HotelDetails::unknown();
    details.address = "1 Rue de Rivoli".to_string();
    details.city = city.to_string();
    details.country = "France".to_string();
    details.popular_facilities = popular.iter().map(|f| f.to_string()).collect();
    details
}

fn paris_source() -> FakeSource {
    FakeSource::new().with_destination(
        "Paris",
        "-1456928",
        vec![
            (summary("1", Some(9.1), Some(150.0)), Some(details("Paris", &["Parking"]))),
            (summary("2", Some(7.8), Some(90.0)), Some(details("Paris", &["Outdoor pool", "Spa"]))),
            (summary("3", Some(9.5), Some(400.0)), Some(details("Paris", &["Pool"]))),
            (summary("4", Some(6.0), None), Some(details("Paris", &["Pool", "Free WiFi"]))),
            (summary("5", None, Some(50.0)), Some(details("Paris", &[]))),
        ],
    )
}

fn query(destinations: &str) -> SearchQuery {
    let mut query = SearchQuery::new(destinations, stay());
    query.rooms = 2;
    query
}

fn ids(report: &travel_agent::DestinationReport) -> Vec<&str> {
    report.hotels().map(|h| h.id.as_str()).collect()
}

#[tokio::test]
async fn test_budget_filter_then_preference_ranking() {
    let assistant = TravelAssistant::new(
        Box::new(paris_source()),
        Box::new(PreferenceRanker::default()),
    );

    let mut query = query("Paris");
    // 3 nights x 2 rooms: hotel 1 costs 900, hotel 3 costs 2400
    query.budget = Some(1000.0);
    query.preferences = Some("pool, spa".to_string());

    let report = assistant.search_destination("Paris", &query).await;

    assert_eq!(report.candidates_found, 5);
    assert_eq!(report.within_budget, 4);
    assert_eq!(report.ranking.method, RankingMethod::Preference);
    // 2: 7.8*0.7 + 5*0.3 = 6.96, 1: 9.1*0.7 = 6.37, 4: 6.0*0.7 + 2.5*0.3 = 4.95
    assert_eq!(ids(&report), vec!["2", "1", "4"]);
    assert!(report.warnings.is_empty());

    let top = report.hotels().next().unwrap();
    assert_eq!(top.location, "Paris, France");
    assert_eq!(top.address, "1 Rue de Rivoli");
}

#[tokio::test]
async fn test_rating_only_without_preferences() {
    let assistant = TravelAssistant::new(
        Box::new(paris_source()),
        Box::new(PreferenceRanker::default()),
    );
    let report = assistant.search_destination("Paris", &query("Paris")).await;

    assert_eq!(ids(&report), vec!["3", "1", "2"]);
    let ratings: Vec<f64> = report.hotels().map(|h| h.rating()).collect();
    assert!(ratings.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_multi_destination_search_is_ordered_and_tolerant() {
    let source = paris_source().with_destination(
        "Rome",
        "-126693",
        vec![(summary("r1", Some(8.0), Some(80.0)), Some(details("Rome", &["Terrace"])))],
    );
    let assistant = TravelAssistant::new(Box::new(source), Box::new(PreferenceRanker::default()));

    let reports = assistant.search(&query("Paris, Atlantis ,Rome")).await;
    assert_eq!(reports.len(), 3);

    assert_eq!(reports[0].destination, "Paris");
    assert_eq!(reports[0].ranking.hotels.len(), 3);

    assert_eq!(reports[1].destination, "Atlantis");
    assert!(reports[1].ranking.hotels.is_empty());
    assert!(reports[1].resolved.is_none());
    assert_eq!(reports[1].warnings, vec!["No destination found for: Atlantis"]);

    assert_eq!(reports[2].destination, "Rome");
    assert_eq!(ids(&reports[2]), vec!["r1"]);
}

#[tokio::test]
async fn test_search_failure_yields_empty_report() {
    let mut source = paris_source();
    source.failing_searches.push("-1456928".to_string());
    let assistant = TravelAssistant::new(Box::new(source), Box::new(PreferenceRanker::default()));

    let report = assistant.search_destination("Paris", &query("Paris")).await;
    assert!(report.resolved.is_some());
    assert_eq!(report.candidates_found, 0);
    assert!(report.ranking.hotels.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("503"));
}

#[tokio::test]
async fn test_missing_details_fall_back_to_placeholders() {
    let source = FakeSource::new().with_destination(
        "Lyon",
        "-1448468",
        vec![
            (summary("a", Some(8.0), Some(100.0)), None),
            (summary("b", Some(7.0), Some(100.0)), Some(details("Lyon", &["Bar"]))),
        ],
    );
    let assistant = TravelAssistant::new(Box::new(source), Box::new(PreferenceRanker::default()));

    let report = assistant.search_destination("Lyon", &query("Lyon")).await;
    assert_eq!(ids(&report), vec!["a", "b"]);

    let first = report.hotels().next().unwrap();
    assert_eq!(first.address, UNKNOWN);
    assert_eq!(first.location, "unknown, unknown");
    assert!(first.popular_facilities.is_empty());
    assert_eq!(report.warnings, vec!["Details unavailable for 1 hotel(s)"]);
}

#[tokio::test]
async fn test_unranked_keeps_all_candidates_in_order() {
    let assistant = TravelAssistant::unranked(Box::new(paris_source()));
    let mut query = query("Paris");
    query.budget = Some(1000.0);

    let report = assistant.search_destination("Paris", &query).await;
    assert_eq!(report.ranking.method, RankingMethod::Unranked);
    assert_eq!(ids(&report), vec!["1", "2", "4", "5"]);
}

#[tokio::test]
async fn test_language_model_failure_falls_back_to_rating_order() {
    let ranker = LlmRanker::new(Box::new(FailingChat), RankingConfig::default()).unwrap();
    let assistant = TravelAssistant::new(Box::new(paris_source()), Box::new(ranker));

    let mut with_preferences = query("Paris");
    with_preferences.preferences = Some("pool".to_string());
    let report = assistant.search_destination("Paris", &with_preferences).await;

    let baseline = TravelAssistant::new(
        Box::new(paris_source()),
        Box::new(PreferenceRanker::default()),
    );
    let expected = baseline.search_destination("Paris", &query("Paris")).await;

    assert_eq!(report.ranking.method, RankingMethod::Preference);
    assert_eq!(ids(&report), ids(&expected));
    assert_eq!(ids(&report), vec!["3", "1", "2"]);
}

#[tokio::test]
async fn test_cache_avoids_repeated_remote_calls() {
    let source = paris_source();
    let calls = source.calls.clone();
    let assistant = TravelAssistant::new(Box::new(source), Box::new(PreferenceRanker::default()))
        .with_cache(Cache::temporary().unwrap());

    let first = assistant.search_destination("Paris", &query("Paris")).await;
    let second = assistant.search_destination("paris", &query("paris")).await;

    assert_eq!(ids(&first), ids(&second));
    assert_eq!(calls.destinations.load(Ordering::SeqCst), 1);
    assert_eq!(calls.searches.load(Ordering::SeqCst), 1);
    assert_eq!(calls.details.load(Ordering::SeqCst), 5);

    // Details lookups share the same cache entries
    let details = assistant.hotel_details("2", &stay()).await.unwrap();
    assert_eq!(details.popular_facilities, vec!["Outdoor pool", "Spa"]);
    assert_eq!(calls.details.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_hotel_details_unavailable() {
    let assistant = TravelAssistant::unranked(Box::new(paris_source()));
    assert!(assistant.hotel_details("missing", &stay()).await.is_none());
}

#[tokio::test]
async fn test_live_paris_search() {
    let Ok(api_key) = std::env::var("RAPIDAPI_KEY") else {
        eprintln!("Skipping live test: RAPIDAPI_KEY not set");
        return;
    };

    let client = BookingClient::new(&api_key, "booking-com15.p.rapidapi.com").unwrap();
    let assistant = TravelAssistant::new(Box::new(client), Box::new(PreferenceRanker::default()));

    let dates = StayDates::parse(None, None).unwrap();
    let report = assistant
        .search_destination("Paris", &SearchQuery::new("Paris", dates))
        .await;

    println!(
        "Found {} candidates, kept {} ({:?})",
        report.candidates_found,
        report.ranking.hotels.len(),
        report.warnings
    );
    assert!(report.ranking.hotels.len() <= 3);
}
