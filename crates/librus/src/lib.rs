pub mod parser;
pub mod scraper;
pub mod session;
pub mod types;

pub use scraper::{ScraperError, fetch_bundle, fetch_calendar, fetch_grades, fetch_profile};
pub use session::{Credentials, PageFetcher, Session, SessionError, SessionState};

pub(crate) const AUTH_BASE_URL: &str = "https://api.librus.pl";
pub(crate) const PORTAL_BASE_URL: &str = "https://synergia.librus.pl";
