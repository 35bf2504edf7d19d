use chrono::{Datelike, NaiveDate};
use scraper::{Html, Selector};

use super::{ParseError, elem_text, stripped_text};
use crate::types::{CalendarDay, CalendarMonth};

pub const MONTH_NAMES: [&str; 12] = [
    "Styczeń",
    "Luty",
    "Marzec",
    "Kwiecień",
    "Maj",
    "Czerwiec",
    "Lipiec",
    "Sierpień",
    "Wrzesień",
    "Październik",
    "Listopad",
    "Grudzień",
];

pub fn month_label(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// A repeated day label replaces the earlier cell's events.
pub fn parse_calendar_month(html: &str, date: NaiveDate) -> Result<CalendarMonth, ParseError> {
    let document = Html::parse_document(html);
    let grid_selector = Selector::parse("div.centrowanie").unwrap();
    let day_selector = Selector::parse("div.kalendarz-dzien").unwrap();
    let number_selector = Selector::parse("div.kalendarz-numer-dnia").unwrap();
    let row_selector = Selector::parse("table tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let grids: Vec<_> = document.select(&grid_selector).collect();
    if grids.is_empty() {
        return Err(ParseError::MissingElement("div.centrowanie".to_string()));
    }

    let mut days = Vec::new();
    for grid in grids {
        for day_cell in grid.select(&day_selector) {
            let day = day_cell
                .select(&number_selector)
                .next()
                .map(|label| elem_text(label).trim().to_string());

            let events = day_cell
                .select(&row_selector)
                .filter_map(|row| row.select(&cell_selector).next())
                .map(stripped_text)
                .collect();

            match days.iter_mut().find(|d: &&mut CalendarDay| d.day == day) {
                Some(existing) => existing.events = events,
                None => days.push(CalendarDay { day, events }),
            }
        }
    }

    log::debug!("Parsed {} calendar day cells", days.len());

    Ok(CalendarMonth {
        label: month_label(date).to_string(),
        date,
        days,
    })
}
