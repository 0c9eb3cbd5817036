// src/mcp_server.rs

use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use travel_agent::{Config, RankingMode, SearchQuery, StayDates, TravelAssistant};

/// Hotel search MCP server
#[derive(Clone)]
pub struct HotelServer {
    assistant: Arc<TravelAssistant>,
}

impl HotelServer {
    pub fn new(assistant: TravelAssistant) -> Self {
        Self {
            assistant: Arc::new(assistant),
        }
    }

    /// Initialize logging to file; stdout carries the protocol
    fn init_logging() -> Result<()> {
        let log_dir = PathBuf::from("logs");
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "travel-agent-mcp.log");

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info"))
                    .add_directive("travel_agent=debug".parse()?),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .init();

        info!("Logging initialized - logs will be written to logs/travel-agent-mcp.log.*");
        Ok(())
    }
}

/// Hotel search parameters
#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct HotelSearchParams {
    #[schemars(description = "Destination name(s), comma-separated (e.g., 'Paris, Rome')")]
    pub destinations: String,
    #[schemars(description = "Check-in date in YYYY-MM-DD format (default: tomorrow)")]
    pub checkin: Option<String>,
    #[schemars(description = "Check-out date in YYYY-MM-DD format (default: day after check-in)")]
    pub checkout: Option<String>,
    #[schemars(description = "Number of adults (default: 2)")]
    pub adults: Option<u32>,
    #[schemars(description = "Number of rooms (default: 1)")]
    pub rooms: Option<u32>,
    #[schemars(description = "Maximum total budget for the entire stay in USD")]
    pub budget: Option<f64>,
    #[schemars(description = "Comma-separated preferences (e.g., 'pool, free wifi, parking')")]
    pub preferences: Option<String>,
    #[schemars(description = "Minimum nightly price")]
    pub min_price: Option<f64>,
    #[schemars(description = "Maximum nightly price")]
    pub max_price: Option<f64>,
}

/// Hotel details parameters
#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct HotelDetailsParams {
    #[schemars(description = "Hotel identifier returned by search_hotels")]
    pub hotel_id: String,
    #[schemars(description = "Check-in date in YYYY-MM-DD format")]
    pub checkin: Option<String>,
    #[schemars(description = "Check-out date in YYYY-MM-DD format")]
    pub checkout: Option<String>,
}

fn error_json(message: String) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn build_search_query(params: HotelSearchParams) -> Result<SearchQuery, String> {
    let dates = StayDates::parse(params.checkin.as_deref(), params.checkout.as_deref())
        .map_err(|e| format!("Invalid dates: {}", e))?;

    let mut query = SearchQuery::new(&params.destinations, dates);
    if query.destinations.is_empty() {
        return Err("At least one destination must be specified".to_string());
    }
    query.adults = params.adults.unwrap_or(2);
    query.rooms = params.rooms.unwrap_or(1);
    query.budget = params.budget;
    query.preferences = params.preferences;
    query.min_price = params.min_price;
    query.max_price = params.max_price;
    Ok(query)
}

#[tool(tool_box)]
impl HotelServer {
    /// Search hotels and return ranked results per destination
    #[tool(description = "Search hotels in one or more destinations, filter by total budget and rank the best matches for the given preferences.")]
    async fn search_hotels(&self, #[tool(aggr)] params: HotelSearchParams) -> String {
        info!(
            destinations = params.destinations,
            checkin = params.checkin.as_deref(),
            checkout = params.checkout.as_deref(),
            adults = params.adults.unwrap_or(2),
            rooms = params.rooms.unwrap_or(1),
            budget = params.budget,
            preferences = params.preferences.as_deref(),
            "Hotel search request received"
        );

        let query = match build_search_query(params) {
            Ok(query) => query,
            Err(e) => {
                warn!("Invalid search parameters: {}", e);
                return error_json(e);
            }
        };

        let reports = self.assistant.search(&query).await;
        debug!(destinations = reports.len(), "Hotel search completed");

        serde_json::to_string_pretty(&reports).unwrap_or_else(|e| {
            error!("Failed to serialize results: {}", e);
            error_json(format!("Failed to serialize results: {}", e))
        })
    }

    /// Full details for one hotel
    #[tool(description = "Get address, website and the full facility lists for a hotel id returned by search_hotels.")]
    async fn get_hotel_details(&self, #[tool(aggr)] params: HotelDetailsParams) -> String {
        info!(hotel_id = params.hotel_id, "Hotel details request received");

        let dates = match StayDates::parse(params.checkin.as_deref(), params.checkout.as_deref()) {
            Ok(dates) => dates,
            Err(e) => {
                warn!("Invalid dates: {}", e);
                return error_json(format!("Invalid dates: {}", e));
            }
        };

        match self.assistant.hotel_details(&params.hotel_id, &dates).await {
            Some(details) => serde_json::to_string_pretty(&details)
                .unwrap_or_else(|e| error_json(format!("Failed to serialize details: {}", e))),
            None => error_json(format!("No details found for hotel {}", params.hotel_id)),
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for HotelServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                concat!(
                    "A hotel search server. search_hotels returns per-destination reports ",
                    "with ranked hotels; get_hotel_details returns the full record for one hotel."
                )
                .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = HotelServer::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting MCP Hotel Server");

    let config = Config::from_env()?;
    let assistant = TravelAssistant::from_config(&config, RankingMode::Auto)?;
    let server = HotelServer::new(assistant);

    let service = server.serve(stdio()).await?;
    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(destinations: &str) -> HotelSearchParams {
        HotelSearchParams {
            destinations: destinations.to_string(),
            checkin: Some("2025-08-15".to_string()),
            checkout: Some("2025-08-18".to_string()),
            adults: None,
            rooms: Some(2),
            budget: Some(900.0),
            preferences: Some("pool".to_string()),
            min_price: None,
            max_price: None,
        }
    }

    #[test]
    fn test_build_search_query() {
        let query = build_search_query(params("Paris, Rome")).unwrap();
        assert_eq!(query.destinations, vec!["Paris", "Rome"]);
        assert_eq!(query.adults, 2);
        assert_eq!(query.rooms, 2);
        assert_eq!(query.dates.nights(), 3);
        assert_eq!(query.preferences(), Some("pool"));
    }

    #[test]
    fn test_build_search_query_rejects_bad_input() {
        assert!(build_search_query(params(" , ")).is_err());

        let mut bad_dates = params("Paris");
        bad_dates.checkin = Some("15-08-2025".to_string());
        assert!(build_search_query(bad_dates).is_err());
    }

    #[test]
    fn test_error_json() {
        let json: serde_json::Value =
            serde_json::from_str(&error_json("boom \"x\"".to_string())).unwrap();
        assert_eq!(json["error"], "boom \"x\"");
    }
}
