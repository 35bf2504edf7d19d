pub mod calendar;
pub mod grades;
pub mod profile;

pub use calendar::{MONTH_NAMES, month_label, parse_calendar_month};
pub use grades::{
    classify_row, parse_grade_entries, parse_grades_page, parse_subject_sheet, semester_view,
};
pub use profile::{normalize_class_name, parse_info_table, parse_student_profile};

use scraper::ElementRef;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Missing expected element: {0}")]
    MissingElement(String),
    #[error("Malformed {context}: expected {expected} cells, found {found}")]
    RowArity {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("Subject '{subject}' has {found} non-empty grade cells, expected 8")]
    SemesterArity { subject: String, found: usize },
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_stripped_text_joins_trimmed_nodes() {
        let document = Html::parse_fragment(
            "<table><tr><td>  Sprawdzian <br/>\n  Nr lekcji: 3 </td></tr></table>",
        );
        let td = document
            .select(&Selector::parse("td").unwrap())
            .next()
            .unwrap();

        assert_eq!(stripped_text(td), "SprawdzianNr lekcji: 3");
        assert_eq!(elem_text(td).trim(), "Sprawdzian \n  Nr lekcji: 3");
    }
}
