use std::collections::HashMap;

use scraper::{Html, Selector};

use super::{ParseError, stripped_text};
use crate::types::StudentProfile;

const FULL_NAME: &str = "Imię i nazwisko ucznia";
const CLASS_NAME: &str = "Klasa";
const CLASS_INDEX: &str = "Nr w dzienniku";
const EDUCATOR: &str = "Wychowawca";
const LOGIN: &str = "Login";

const CLASS_NAME_LEN: usize = 3;

pub fn parse_info_table(html: &str) -> HashMap<String, String> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.line0, tr.line1").unwrap();
    let header_selector = Selector::parse("th.big").unwrap();
    let value_selector = Selector::parse("td").unwrap();

    let mut fields = HashMap::new();
    for row in document.select(&row_selector) {
        let (Some(header), Some(value)) = (
            row.select(&header_selector).next(),
            row.select(&value_selector).next(),
        ) else {
            continue;
        };
        fields.insert(stripped_text(header), stripped_text(value));
    }

    fields
}

pub fn parse_student_profile(html: &str) -> Result<StudentProfile, ParseError> {
    let fields = parse_info_table(html);
    log::debug!("Student info table has {} field(s)", fields.len());

    let field = |key: &str| {
        fields
            .get(key)
            .cloned()
            .ok_or_else(|| ParseError::MissingField(key.to_string()))
    };

    Ok(StudentProfile {
        full_name: field(FULL_NAME)?,
        class_name: normalize_class_name(&field(CLASS_NAME)?),
        class_index: field(CLASS_INDEX)?,
        educator: field(EDUCATOR)?,
        login_id: field(LOGIN)?,
    })
}

pub fn normalize_class_name(raw: &str) -> String {
    raw.chars()
        .take(CLASS_NAME_LEN)
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_uppercase()
}
