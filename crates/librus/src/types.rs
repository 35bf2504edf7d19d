use std::collections::HashSet;
use std::fmt::Display;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::parser;
use crate::scraper::ScraperError;

pub const TEST_KEYWORD: &str = "Sprawdzian";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub full_name: String,
    pub class_name: String,
    pub class_index: String,
    pub educator: String,
    pub login_id: String,
}

impl Display for StudentProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.full_name, self.login_id)?;
        writeln!(f, "  Class:    {} (no. {})", self.class_name, self.class_index)?;
        write!(f, "  Educator: {}", self.educator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub grade: String,
    pub comment: String,
    pub title: String,
    pub added_date: String,
    pub teacher: String,
    pub correction_grade: String,
    pub added_by: String,
}

impl Display for GradeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:<3} {}", self.added_date, self.grade, self.title)?;
        if !self.correction_grade.is_empty() {
            write!(f, " (corrected: {})", self.correction_grade)?;
        }
        if !self.teacher.is_empty() {
            write!(f, " — {}", self.teacher)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrades {
    pub name: String,
    pub grades: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectGradeSheet {
    subjects: Vec<SubjectGrades>,
}

impl SubjectGradeSheet {
    pub(crate) fn insert(&mut self, subject: SubjectGrades) {
        match self.subjects.iter_mut().find(|s| s.name == subject.name) {
            Some(existing) => existing.grades = subject.grades,
            None => self.subjects.push(subject),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.subjects
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.grades.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.subjects.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectGrades> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalGrade {
    pub subject: String,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradesPage {
    pub entries: Vec<GradeEntry>,
    pub sheet: SubjectGradeSheet,
}

impl GradesPage {
    pub fn teachers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.teacher.as_str())
            .filter(|t| !t.is_empty() && seen.insert(*t))
            .map(str::to_string)
            .collect()
    }

    pub fn subjects(&self) -> Vec<&str> {
        self.sheet.names()
    }

    pub fn final_grades(&self) -> Vec<FinalGrade> {
        self.sheet
            .iter()
            .filter_map(|s| {
                s.grades.last().map(|grade| FinalGrade {
                    subject: s.name.clone(),
                    grade: grade.clone(),
                })
            })
            .collect()
    }

    pub fn semester_view(&self, subject: &str) -> Result<SemesterGradeView, ScraperError> {
        let grades = self
            .sheet
            .get(subject)
            .ok_or_else(|| ScraperError::SubjectNotFound(subject.to_string()))?;
        Ok(parser::semester_view(subject, grades)?)
    }

    pub fn entries_by_teacher(&self, teacher: &str) -> Vec<&GradeEntry> {
        self.entries.iter().filter(|e| e.teacher == teacher).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterGradeView {
    pub first_semester_grades: String,
    pub first_semester_average: String,
    pub first_semester_prediction: String,
    pub first_semester_final: String,
    pub second_semester_grades: String,
    pub second_semester_average: String,
    pub second_semester_prediction: String,
    pub second_semester_final: String,
}

impl Display for SemesterGradeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Semester I")?;
        writeln!(f, "  Grades:     {}", self.first_semester_grades)?;
        writeln!(f, "  Average:    {}", self.first_semester_average)?;
        writeln!(f, "  Predicted:  {}", self.first_semester_prediction)?;
        writeln!(f, "  Final:      {}", self.first_semester_final)?;
        writeln!(f, "Semester II")?;
        writeln!(f, "  Grades:     {}", self.second_semester_grades)?;
        writeln!(f, "  Average:    {}", self.second_semester_average)?;
        writeln!(f, "  Predicted:  {}", self.second_semester_prediction)?;
        write!(f, "  Final:      {}", self.second_semester_final)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: Option<String>,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub label: String,
    pub date: NaiveDate,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    pub fn events_on(&self, day: u32) -> Result<&[String], ScraperError> {
        let key = day.to_string();
        self.days
            .iter()
            .find(|d| d.day.as_deref() == Some(key.as_str()))
            .map(|d| d.events.as_slice())
            .ok_or(ScraperError::DayNotFound(key))
    }

    /// A day without an entry is [`ScraperError::DayNotFound`]; a day with an
    /// entry but no events is an empty slice.
    pub fn today_events(&self) -> Result<&[String], ScraperError> {
        self.events_on(self.date.day())
    }

    pub fn is_test_today(&self) -> Result<bool, ScraperError> {
        Ok(self
            .today_events()?
            .iter()
            .any(|event| event.contains(TEST_KEYWORD)))
    }

    pub fn event_count(&self) -> usize {
        self.days.iter().map(|d| d.events.len()).sum()
    }
}

impl Display for CalendarMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ {} {} ─ {} event(s)", self.label, self.date.year(), self.event_count())?;
        for day in self.days.iter().filter(|d| !d.events.is_empty()) {
            writeln!(f, "│ {:>2}.", day.day.as_deref().unwrap_or("?"))?;
            for event in &day.events {
                writeln!(f, "│     {}", event)?;
            }
        }
        write!(f, "└─")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentBundle {
    pub profile: StudentProfile,
    pub teachers: Vec<String>,
    pub grades: SubjectGradeSheet,
    pub subject_semester_view: Option<SemesterGradeView>,
    pub calendar_month: CalendarMonth,
    pub today_events: Option<Vec<String>>,
}
