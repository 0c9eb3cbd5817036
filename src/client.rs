//! HTTP client and response parser for the Booking.com RapidAPI endpoints

use crate::assistant::HotelSource;
use crate::config::Config;
use crate::{
    Destination, HotelDetails, HotelSummary, PriceBreakdown, ReviewScore, SearchQuery, StayDates,
    TravelError, UNKNOWN,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_CURRENCY: &str = "USD";

/// Client for destination lookup, hotel search and hotel details
pub struct BookingClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    api_host: String,
    parser: HotelResponseParser,
}

impl BookingClient {
    /// Create a new client for the given RapidAPI credentials
    pub fn new(api_key: &str, api_host: &str) -> Result<Self, TravelError> {
        debug!(api_host = api_host, "Creating new booking client");
        let http_client = Client::builder()
            .user_agent(concat!("travel-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: format!("https://{}/api/v1", api_host),
            api_key: api_key.to_string(),
            api_host: api_host.to_string(),
            parser: HotelResponseParser::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TravelError> {
        Self::new(&config.rapidapi_key, &config.rapidapi_host)
    }

    /// Point the client at another server, e.g. a local stub
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, TravelError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        info!(url = %url, "Making HTTP request to booking API");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .query(params)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "HTTP request completed"
        );

        if !status.is_success() {
            error!(status = %status, endpoint = endpoint, "HTTP request failed");
            return Err(TravelError::ApiStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl HotelSource for BookingClient {
    #[instrument(level = "info", skip(self))]
    async fn resolve_destination(&self, query: &str) -> Result<Option<Destination>, TravelError> {
        let payload = self
            .get_json("hotels/searchDestination", &[("query", query.to_string())])
            .await?;
        let destination = self.parser.parse_destination(&payload);
        if destination.is_none() {
            warn!(query = query, "No destination found");
        }
        Ok(destination)
    }

    #[instrument(level = "info", skip(self, query), fields(dest_id = %destination.dest_id))]
    async fn search_hotels(
        &self,
        destination: &Destination,
        query: &SearchQuery,
    ) -> Result<Vec<HotelSummary>, TravelError> {
        let mut params = vec![
            ("dest_id", destination.dest_id.clone()),
            ("search_type", destination.search_type.clone()),
            ("arrival_date", query.dates.checkin_str()),
            ("departure_date", query.dates.checkout_str()),
            ("adults", query.adults.to_string()),
            ("room_qty", query.rooms.to_string()),
            ("page_number", "1".to_string()),
            ("units", "metric".to_string()),
            ("currency_code", DEFAULT_CURRENCY.to_string()),
        ];
        if let Some(min_price) = query.min_price {
            params.push(("price_min", min_price.to_string()));
        }
        if let Some(max_price) = query.max_price {
            params.push(("price_max", max_price.to_string()));
        }

        let payload = self.get_json("hotels/searchHotels", &params).await?;
        let hotels = self
            .parser
            .parse_search_results(&payload, query.dates.billable_nights(), query.rooms);
        info!(hotels_found = hotels.len(), "Hotel search parsed");
        Ok(hotels)
    }

    #[instrument(level = "info", skip(self, dates))]
    async fn hotel_details(
        &self,
        hotel_id: &str,
        dates: &StayDates,
    ) -> Result<Option<HotelDetails>, TravelError> {
        let params = [
            ("hotel_id", hotel_id.to_string()),
            ("arrival_date", dates.checkin_str()),
            ("departure_date", dates.checkout_str()),
            ("currency_code", DEFAULT_CURRENCY.to_string()),
            ("languagecode", "en-us".to_string()),
        ];
        let payload = self.get_json("hotels/getHotelDetails", &params).await?;
        Ok(self.parser.parse_details(&payload))
    }
}

/// Turns raw API payloads into typed records.
///
/// Missing or malformed fields are replaced by placeholders; parsing never
/// fails once a payload is valid JSON.
#[derive(Debug, Clone, Default)]
pub struct HotelResponseParser;

impl HotelResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// First match of a destination search, if any
    pub fn parse_destination(&self, payload: &Value) -> Option<Destination> {
        let first = payload.get("data")?.as_array()?.first()?;
        let dest_id = text(first.get("dest_id"))?;

        Some(Destination {
            dest_id,
            search_type: text(first.get("search_type")).unwrap_or_else(|| "CITY".to_string()),
            label: text(first.get("label"))
                .or_else(|| text(first.get("name")))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }

    /// Hotels of a search page; entries without an id are skipped
    pub fn parse_search_results(
        &self,
        payload: &Value,
        nights: u32,
        rooms: u32,
    ) -> Vec<HotelSummary> {
        let Some(hotels) = payload
            .get("data")
            .and_then(|d| d.get("hotels"))
            .and_then(Value::as_array)
        else {
            warn!("Search response had no hotel list");
            return Vec::new();
        };

        hotels
            .iter()
            .filter_map(|hotel| {
                let Some(id) = text(hotel.get("hotel_id")) else {
                    debug!("Skipping search entry without hotel_id");
                    return None;
                };
                let property = hotel.get("property").unwrap_or(&Value::Null);
                let gross = property
                    .get("priceBreakdown")
                    .and_then(|p| p.get("grossPrice"))
                    .unwrap_or(&Value::Null);

                Some(HotelSummary {
                    id,
                    name: text(property.get("name")).unwrap_or_else(|| UNKNOWN.to_string()),
                    review: ReviewScore {
                        score: number(property.get("reviewScore")),
                        word: text(property.get("reviewScoreWord"))
                            .unwrap_or_else(|| UNKNOWN.to_string()),
                        count: number(property.get("reviewCount"))
                            .filter(|c| *c >= 0.0)
                            .map(|c| c as u64)
                            .unwrap_or(0),
                    },
                    price: PriceBreakdown::new(
                        text(gross.get("currency")).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                        number(gross.get("value")),
                        nights,
                        rooms,
                    ),
                })
            })
            .collect()
    }

    /// Details payload, or `None` when the response carries no data
    pub fn parse_details(&self, payload: &Value) -> Option<HotelDetails> {
        let data = payload.get("data").filter(|d| d.is_object())?;
        let or_unknown = |key: &str| text(data.get(key)).unwrap_or_else(|| UNKNOWN.to_string());

        Some(HotelDetails {
            name: or_unknown("hotel_name"),
            address: or_unknown("address"),
            city: or_unknown("city"),
            country: or_unknown("country_trans"),
            website: or_unknown("url"),
            popular_facilities: names(
                data.get("facilities_block")
                    .and_then(|b| b.get("facilities")),
            ),
            facilities: names(data.get("property_highlight_strip")),
            family_facilities: names(data.get("family_facilities")),
        })
    }
}

/// Non-empty string, or a number rendered as text
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number, accepting numeric strings
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Names from a list of strings or of `{ "name": ... }` objects
fn names(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(_) => text(item.get("name")),
                    other => text(Some(other)),
                })
                .collect()
        })
        .unwrap_or_default()
}
