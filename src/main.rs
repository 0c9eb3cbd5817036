//! CLI interface for travel-agent

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use tracing_subscriber::EnvFilter;
use travel_agent::display::{render_hotel_details, render_reports};
use travel_agent::{Config, RankingMode, SearchQuery, StayDates, TravelAssistant};

#[derive(Parser)]
#[command(name = "travel-agent")]
#[command(about = "Search hotels and rank them against your preferences")]
#[command(version)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for hotels in one or more destinations
    Search {
        /// Destination name(s), comma-separated
        destinations: String,
        /// Check-in date (YYYY-MM-DD), defaults to tomorrow
        #[arg(long)]
        checkin: Option<String>,
        /// Check-out date (YYYY-MM-DD), defaults to the day after check-in
        #[arg(long)]
        checkout: Option<String>,
        /// Number of adults
        #[arg(long, default_value = "2")]
        adults: u32,
        /// Number of rooms
        #[arg(long, default_value = "1")]
        rooms: u32,
        /// Maximum total budget for the entire stay in USD
        #[arg(long)]
        budget: Option<f64>,
        /// Preferences (comma-separated, e.g. "pool, free wifi")
        #[arg(short, long)]
        preferences: Option<String>,
        /// Minimum nightly price sent to the search
        #[arg(long)]
        min_price: Option<f64>,
        /// Maximum nightly price sent to the search
        #[arg(long)]
        max_price: Option<f64>,
        /// Ranking mode (auto, local, llm, none)
        #[arg(long, default_value = "auto")]
        ranking: String,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show full information about one hotel
    Details {
        /// Hotel identifier from the search results
        hotel_id: String,
        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        checkin: Option<String>,
        /// Check-out date (YYYY-MM-DD)
        #[arg(long)]
        checkout: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,travel_agent=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env()?;
    println!("Welcome to Travel Booking Agent!");

    match cli.command {
        Commands::Search {
            destinations,
            checkin,
            checkout,
            adults,
            rooms,
            budget,
            preferences,
            min_price,
            max_price,
            ranking,
            output,
        } => {
            let dates = StayDates::parse(checkin.as_deref(), checkout.as_deref())?;
            let mode = ranking.parse::<RankingMode>()?;

            let mut query = SearchQuery::new(&destinations, dates);
            query.adults = adults;
            query.rooms = rooms;
            query.budget = budget;
            query.preferences = preferences;
            query.min_price = min_price;
            query.max_price = max_price;

            if query.destinations.is_empty() {
                anyhow::bail!("at least one destination is required");
            }

            let assistant = TravelAssistant::from_config(&config, mode)?;

            println!("Searching hotels...");
            let reports = assistant.search(&query).await;
            print!("{}", render_reports(&reports, &query));

            if let Some(output_file) = output {
                let json = serde_json::to_string_pretty(&reports)?;
                fs::write(&output_file, &json)
                    .with_context(|| format!("writing results to {}", output_file))?;
                println!("Results saved to {}", output_file);
            }
        }
        Commands::Details {
            hotel_id,
            checkin,
            checkout,
        } => {
            let dates = StayDates::parse(checkin.as_deref(), checkout.as_deref())?;
            let assistant = TravelAssistant::from_config(&config, RankingMode::Off)?;

            println!("Fetching hotel details...");
            let details = assistant.hotel_details(&hotel_id, &dates).await;
            print!("{}", render_hotel_details(details.as_ref()));
        }
    }

    Ok(())
}
