//! Console rendering of search reports and hotel details

use crate::assistant::{BudgetFilter, DestinationReport};
use crate::ranking::{RankingMethod, ScoredHotel};
use crate::{HotelDetails, HotelRecord, SearchQuery, UNKNOWN};
use std::fmt::Write;

const POPULAR_SHOWN: usize = 3;
const OTHER_SHOWN: usize = 2;

/// Plain-text table with fixed-width, multi-line cells
struct Table {
    columns: Vec<(&'static str, usize)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(columns: Vec<(&'static str, usize)>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn separator(&self) -> String {
        let mut line = String::from("+");
        for (_, width) in &self.columns {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    }

    fn render_row(&self, out: &mut String, cells: &[String]) {
        let wrapped: Vec<Vec<String>> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, (_, width))| wrap(cells.get(i).map(String::as_str).unwrap_or(""), *width))
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line in 0..height {
            out.push('|');
            for (cell, (_, width)) in wrapped.iter().zip(&self.columns) {
                let text = cell.get(line).map(String::as_str).unwrap_or("");
                let _ = write!(out, " {:<width$} |", text, width = *width);
            }
            out.push('\n');
        }
    }

    fn render(&self) -> String {
        let separator = self.separator();
        let mut out = String::new();
        out.push_str(&separator);
        out.push('\n');

        let headers: Vec<String> = self.columns.iter().map(|(h, _)| h.to_string()).collect();
        self.render_row(&mut out, &headers);
        out.push_str(&separator);
        out.push('\n');

        for row in &self.rows {
            self.render_row(&mut out, row);
            out.push_str(&separator);
            out.push('\n');
        }
        out
    }
}

/// Word-wrap `text` to `width` characters; explicit newlines are kept and
/// words longer than the width are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();

            if current_len > 0 && current_len + 1 + chars.len() > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }

            while chars.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += chars.len();
            current.extend(chars);
        }

        lines.push(current);
    }

    lines
}

fn money(amount: Option<f64>, currency: &str) -> String {
    match amount {
        Some(amount) => format!("{:.2} {}", amount, currency),
        None => UNKNOWN.to_string(),
    }
}

fn rating_cell(hotel: &HotelRecord) -> String {
    let score = hotel
        .review
        .score
        .map(|s| format!("{:.1}", s))
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!("Score: {}\n{}\n({} reviews)", score, hotel.review.word, hotel.review.count)
}

fn price_cell(hotel: &HotelRecord) -> String {
    let price = &hotel.price;
    format!(
        "Per night: {}\nTotal ({} nights, {} rooms):\n{}",
        money(price.per_night, &price.currency),
        price.nights,
        price.rooms,
        money(price.total, &price.currency)
    )
}

fn location_cell(hotel: &HotelRecord) -> String {
    format!(
        "Address:\n{}\nLocation:\n{}\nWebsite:\n{}",
        hotel.address, hotel.location, hotel.website
    )
}

fn facilities_cell(hotel: &HotelRecord) -> String {
    let mut lines = Vec::new();
    if !hotel.popular_facilities.is_empty() {
        lines.push("Popular:".to_string());
        lines.extend(
            hotel
                .popular_facilities
                .iter()
                .take(POPULAR_SHOWN)
                .map(|f| format!("• {}", f)),
        );
    }
    if !hotel.facilities.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Other:".to_string());
        lines.extend(hotel.facilities.iter().take(OTHER_SHOWN).map(|f| format!("• {}", f)));
    }

    if lines.is_empty() {
        "No facilities listed".to_string()
    } else {
        lines.join("\n")
    }
}

/// Hotel table; `show_score` adds the ranking score column
pub fn render_hotel_table(hotels: &[ScoredHotel], show_score: bool) -> String {
    let mut columns = vec![
        ("Hotel ID", 10),
        ("Hotel Name", 25),
        ("Rating", 18),
        ("Price", 26),
        ("Location & Contact", 40),
        ("Facilities", 32),
    ];
    if show_score {
        columns.push(("Score", 6));
    }

    let mut table = Table::new(columns);
    for scored in hotels {
        let hotel = &scored.hotel;
        let mut row = vec![
            hotel.id.clone(),
            hotel.name.clone(),
            rating_cell(hotel),
            price_cell(hotel),
            location_cell(hotel),
            facilities_cell(hotel),
        ];
        if show_score {
            row.push(format!("{:.2}", scored.score));
        }
        table.add_row(row);
    }
    table.render()
}

/// Search parameters shown above each destination's results
pub fn render_search_header(destination: &str, query: &SearchQuery) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nSearching for hotels in {}", destination);
    let _ = writeln!(
        out,
        "Check-in: {}, Check-out: {} ({} nights)",
        query.dates.checkin_str(),
        query.dates.checkout_str(),
        query.dates.nights()
    );
    let _ = writeln!(out, "Adults: {}, Rooms: {}", query.adults, query.rooms);
    if let Some(budget) = query.budget {
        let filter = BudgetFilter::new(budget, &query.dates, query.rooms);
        let _ = writeln!(
            out,
            "Total Budget: ${:.2} (approx. ${:.2} per night)",
            budget,
            filter.per_night_budget()
        );
    }
    if let Some(preferences) = query.preferences() {
        let _ = writeln!(out, "Preferences: {}", preferences);
    }
    out
}

pub fn render_report(report: &DestinationReport, query: &SearchQuery) -> String {
    let mut out = render_search_header(&report.destination, query);

    for warning in &report.warnings {
        let _ = writeln!(out, "Warning: {}", warning);
    }

    if report.ranking.hotels.is_empty() {
        out.push_str("No hotels found matching your criteria.\n");
        return out;
    }

    let title = match report.ranking.method {
        RankingMethod::Unranked => "Found Hotels:".to_string(),
        RankingMethod::Preference if query.preferences().is_some() => {
            "Top Picks (ranked by your preferences):".to_string()
        }
        RankingMethod::Preference => "Top Picks (ranked by rating):".to_string(),
        RankingMethod::LanguageModel => "Top Picks (ranked by AI assistant):".to_string(),
    };
    let _ = writeln!(
        out,
        "\n{} {} of {} candidates",
        title,
        report.ranking.hotels.len(),
        report.within_budget
    );
    out.push_str(&render_hotel_table(
        &report.ranking.hotels,
        report.ranking.method != RankingMethod::Unranked,
    ));
    out
}

/// All reports followed by the pointer to the details command
pub fn render_reports(reports: &[DestinationReport], query: &SearchQuery) -> String {
    let mut out: String = reports.iter().map(|r| render_report(r, query)).collect();
    if reports.iter().any(|r| !r.ranking.hotels.is_empty()) {
        out.push_str(concat!(
            "\nNote: Use 'details <hotel_id>' command to see full hotel information ",
            "including all facilities.\n"
        ));
    }
    out
}

pub fn render_hotel_details(details: Option<&HotelDetails>) -> String {
    let Some(details) = details else {
        return "No details found for this hotel.\n".to_string();
    };

    let mut out = String::from("\nHotel Details\n");
    let _ = writeln!(out, "Name: {}", details.name);
    let _ = writeln!(out, "Address: {}", details.address);
    let _ = writeln!(out, "Location: {}", details.location());
    let _ = writeln!(out, "Website: {}", details.website);

    let sections = [
        ("Popular Facilities", &details.popular_facilities),
        ("Family Facilities", &details.family_facilities),
        ("Other Amenities", &details.facilities),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}:", title);
        for item in items {
            let _ = writeln!(out, "• {}", item);
        }
    }

    out.push_str("\nNote: Some facilities may be subject to additional charges.\n");
    out
}
