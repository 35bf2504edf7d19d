use scraper::{ElementRef, Html, Selector};

use super::{ParseError, elem_text};
use crate::types::{GradeEntry, GradesPage, SemesterGradeView, SubjectGradeSheet, SubjectGrades};

const DETAIL_COLUMNS: usize = 7;
const SEMESTER_FIELDS: usize = 8;

// Layout assumptions for subject summary rows. Keep them here.
const MIN_SUBJECT_ROW_CELLS: usize = 11;
const HEADER_CELL: &str = "Ocena";
const SUBJECT_CELL: usize = 1;
const FIRST_GRADE_CELL: usize = 2;

/// `cells` are the raw, untrimmed texts of the row's `td` descendants.
pub fn classify_row(cells: &[String]) -> Option<SubjectGrades> {
    if cells.len() < MIN_SUBJECT_ROW_CELLS || cells[SUBJECT_CELL] == HEADER_CELL {
        return None;
    }

    let name = cells[SUBJECT_CELL].trim();
    if name.contains('\n') {
        return None;
    }

    Some(SubjectGrades {
        name: name.to_string(),
        grades: cells[FIRST_GRADE_CELL..]
            .iter()
            .map(|cell| cell.trim().to_string())
            .collect(),
    })
}

pub fn parse_grades_page(html: &str) -> Result<GradesPage, ParseError> {
    let document = Html::parse_document(html);

    Ok(GradesPage {
        entries: grade_entries(&document)?,
        sheet: subject_sheet(&document)?,
    })
}

pub fn parse_grade_entries(html: &str) -> Result<Vec<GradeEntry>, ParseError> {
    grade_entries(&Html::parse_document(html))
}

pub fn parse_subject_sheet(html: &str) -> Result<SubjectGradeSheet, ParseError> {
    subject_sheet(&Html::parse_document(html))
}

fn cell_texts(row: ElementRef, cell_selector: &Selector) -> Vec<String> {
    row.select(cell_selector).map(elem_text).collect()
}

fn grade_entries(document: &Html) -> Result<Vec<GradeEntry>, ParseError> {
    let table_selector = Selector::parse("table.decorated.stretch").unwrap();
    let row_selector = Selector::parse("table.decorated.stretch tr.detail-grades").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    if document.select(&table_selector).next().is_none() {
        return Err(ParseError::MissingElement(
            "table.decorated.stretch".to_string(),
        ));
    }

    let entries = document
        .select(&row_selector)
        .map(|row| {
            let cells = cell_texts(row, &cell_selector)
                .iter()
                .map(|cell| cell.trim().to_string())
                .collect();
            grade_entry(cells)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Parsed {} grade entries", entries.len());
    Ok(entries)
}

fn grade_entry(cells: Vec<String>) -> Result<GradeEntry, ParseError> {
    let [
        grade,
        comment,
        title,
        added_date,
        teacher,
        correction_grade,
        added_by,
    ]: [String; DETAIL_COLUMNS] = cells.try_into().map_err(|cells: Vec<String>| {
        ParseError::RowArity {
            context: "grade detail row".to_string(),
            expected: DETAIL_COLUMNS,
            found: cells.len(),
        }
    })?;

    Ok(GradeEntry {
        grade,
        comment,
        title,
        added_date,
        teacher,
        correction_grade,
        added_by,
    })
}

fn subject_sheet(document: &Html) -> Result<SubjectGradeSheet, ParseError> {
    let row_selector = Selector::parse(".line0, .line1").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut sheet = SubjectGradeSheet::default();
    for row in document.select(&row_selector) {
        if let Some(subject) = classify_row(&cell_texts(row, &cell_selector)) {
            sheet.insert(subject);
        }
    }

    if sheet.is_empty() {
        return Err(ParseError::MissingElement("subject summary rows".to_string()));
    }

    log::debug!("Parsed {} subject rows", sheet.len());
    Ok(sheet)
}

/// Empty cells are dropped first; exactly eight must remain.
pub fn semester_view(subject: &str, grades: &[String]) -> Result<SemesterGradeView, ParseError> {
    let values: Vec<String> = grades
        .iter()
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.replace('\n', ","))
        .collect();

    let [
        first_semester_grades,
        first_semester_average,
        first_semester_prediction,
        first_semester_final,
        second_semester_grades,
        second_semester_average,
        second_semester_prediction,
        second_semester_final,
    ]: [String; SEMESTER_FIELDS] = values.try_into().map_err(|values: Vec<String>| {
        ParseError::SemesterArity {
            subject: subject.to_string(),
            found: values.len(),
        }
    })?;

    Ok(SemesterGradeView {
        first_semester_grades,
        first_semester_average,
        first_semester_prediction,
        first_semester_final,
        second_semester_grades,
        second_semester_average,
        second_semester_prediction,
        second_semester_final,
    })
}
