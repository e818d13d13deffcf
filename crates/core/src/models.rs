use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single non-null spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

impl CellValue {
    /// Interprets the cell as a calendar date. Numbers are never treated as dates.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(dt) => Some(dt.date()),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(dt) if dt.time() == NaiveTime::MIN => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            CellValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One table row keyed by normalized column name, in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeRecord {
    pub row_index: usize,
    #[serde(flatten)]
    pub fields: IndexMap<String, CellValue>,
}

impl EmployeeRecord {
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(ToString::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub row_index: usize,
}

/// Retrievable text unit derived from one table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, row_index: usize) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata { row_index },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeniorityBucket {
    #[serde(rename = "New Hire (< 1 year)")]
    NewHire,
    #[serde(rename = "Junior (1-3 years)")]
    Junior,
    #[serde(rename = "Mid-level (3-7 years)")]
    MidLevel,
    #[serde(rename = "Senior (7+ years)")]
    Senior,
}

impl SeniorityBucket {
    pub fn from_years(years: f64) -> Self {
        if years < 1.0 {
            SeniorityBucket::NewHire
        } else if years < 3.0 {
            SeniorityBucket::Junior
        } else if years < 7.0 {
            SeniorityBucket::MidLevel
        } else {
            SeniorityBucket::Senior
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeniorityBucket::NewHire => "New Hire (< 1 year)",
            SeniorityBucket::Junior => "Junior (1-3 years)",
            SeniorityBucket::MidLevel => "Mid-level (3-7 years)",
            SeniorityBucket::Senior => "Senior (7+ years)",
        }
    }
}

/// Which path produced an [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerRoute {
    Structured,
    Retrieval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub route: AnswerRoute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mirrors_spreadsheet_text() {
        assert_eq!(CellValue::Float(5.0).to_string(), "5.0");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Int(42).to_string(), "42");
        let midnight = NaiveDate::from_ymd_opt(2020, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Date(midnight).to_string(), "2020-01-15");
    }

    #[test]
    fn text_dates_parse_in_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 3, 4);
        for raw in ["2019-03-04", "03/04/2019", "2019-03-04 08:30:00", "2019-03-04T00:00:00Z"] {
            assert_eq!(CellValue::Text(raw.into()).as_date(), expected, "{raw}");
        }
        assert_eq!(CellValue::Text("not a date".into()).as_date(), None);
        assert_eq!(CellValue::Int(43000).as_date(), None);
    }

    #[test]
    fn seniority_boundaries() {
        assert_eq!(SeniorityBucket::from_years(0.99), SeniorityBucket::NewHire);
        assert_eq!(SeniorityBucket::from_years(-0.5), SeniorityBucket::NewHire);
        assert_eq!(SeniorityBucket::from_years(1.0), SeniorityBucket::Junior);
        assert_eq!(SeniorityBucket::from_years(3.0), SeniorityBucket::MidLevel);
        assert_eq!(SeniorityBucket::from_years(7.0), SeniorityBucket::Senior);
        assert_eq!(
            serde_json::to_string(&SeniorityBucket::MidLevel).unwrap(),
            "\"Mid-level (3-7 years)\""
        );
    }
}
