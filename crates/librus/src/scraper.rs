use chrono::{Local, NaiveDate};

use crate::parser::{self, ParseError};
use crate::session::{PageFetcher, SessionError};
use crate::types::{CalendarMonth, GradesPage, StudentBundle, StudentProfile};

const INFO_PATH: &str = "/informacja";
const GRADES_PATH: &str = "/przegladaj_oceny/uczen";
const CALENDAR_PATH: &str = "/terminarz";

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),
    #[error("No calendar entry for day {0}")]
    DayNotFound(String),
}

fn page_url(fetcher: &impl PageFetcher, path: &str) -> String {
    format!("{}{}", fetcher.base_url(), path)
}

pub fn fetch_profile(fetcher: &impl PageFetcher) -> Result<StudentProfile, ScraperError> {
    let html = fetcher.fetch_page(&page_url(fetcher, INFO_PATH))?;
    Ok(parser::parse_student_profile(&html)?)
}

pub fn fetch_grades(fetcher: &impl PageFetcher) -> Result<GradesPage, ScraperError> {
    let html = fetcher.fetch_page(&page_url(fetcher, GRADES_PATH))?;
    let page = parser::parse_grades_page(&html)?;
    log::info!(
        "Parsed {} grade(s) across {} subject(s)",
        page.entries.len(),
        page.sheet.len()
    );
    Ok(page)
}

pub fn fetch_calendar(fetcher: &impl PageFetcher) -> Result<CalendarMonth, ScraperError> {
    fetch_calendar_on(fetcher, Local::now().date_naive())
}

pub fn fetch_calendar_on(
    fetcher: &impl PageFetcher,
    date: NaiveDate,
) -> Result<CalendarMonth, ScraperError> {
    let html = fetcher.fetch_page(&page_url(fetcher, CALENDAR_PATH))?;
    let month = parser::parse_calendar_month(&html, date)?;
    log::info!("Parsed {} event(s) for {}", month.event_count(), month.label);
    Ok(month)
}

/// A missing `subject` or a day without a calendar entry leave that field `None`.
pub fn fetch_bundle(
    fetcher: &impl PageFetcher,
    subject: &str,
) -> Result<StudentBundle, ScraperError> {
    fetch_bundle_on(fetcher, subject, Local::now().date_naive())
}

pub fn fetch_bundle_on(
    fetcher: &impl PageFetcher,
    subject: &str,
    date: NaiveDate,
) -> Result<StudentBundle, ScraperError> {
    let profile = fetch_profile(fetcher)?;
    let grades = fetch_grades(fetcher)?;
    let calendar_month = fetch_calendar_on(fetcher, date)?;

    let subject_semester_view = match grades.semester_view(subject) {
        Ok(view) => Some(view),
        Err(ScraperError::SubjectNotFound(name)) => {
            log::warn!("Subject {} not on the grades page", name);
            None
        }
        Err(e) => return Err(e),
    };

    let today_events = match calendar_month.today_events() {
        Ok(events) => Some(events.to_vec()),
        Err(ScraperError::DayNotFound(day)) => {
            log::info!("No calendar entry for day {}", day);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(StudentBundle {
        teachers: grades.teachers(),
        profile,
        grades: grades.sheet,
        subject_semester_view,
        calendar_month,
        today_events,
    })
}
