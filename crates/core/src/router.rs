//! Public entry point: structured shortcut first, retrieval otherwise.

use crate::answerer::RetrievalAnswerer;
use crate::documentizer::row_document;
use crate::error::QueryError;
use crate::intent::{IntentKey, ParsedIntent};
use crate::models::{Answer, AnswerRoute, EmployeeRecord};
use crate::query_engine::{
    StructuredQueryEngine, DEPARTMENT_COLUMN, EMAIL_COLUMN, NAME_COLUMN, TITLE_COLUMN,
};
use crate::table::TableError;
use crate::vectorindex::EmbeddingIndex;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const MAX_LISTED: usize = 25;

/// A lookup the structured engine can answer on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredLookup {
    Name(String),
    Department(String),
    Role(String),
    MinExperience(f64),
}

impl StructuredLookup {
    /// Only an intent with exactly one extracted key resolves; anything else is ambiguous.
    pub fn from_intent(intent: &ParsedIntent) -> Option<Self> {
        let keys = intent.keys();
        let [key] = keys.as_slice() else {
            return None;
        };
        let value = intent.get(*key)?.to_string();
        match key {
            IntentKey::Name => Some(StructuredLookup::Name(value)),
            IntentKey::Department => Some(StructuredLookup::Department(value)),
            IntentKey::Role => Some(StructuredLookup::Role(value)),
            IntentKey::Experience => value.parse().ok().map(StructuredLookup::MinExperience),
            IntentKey::Seniority => None,
        }
    }

    fn run(&self, engine: &StructuredQueryEngine) -> Vec<EmployeeRecord> {
        match self {
            StructuredLookup::Name(v) => engine.search_by_name(v),
            StructuredLookup::Department(v) => engine.search_by_department(v),
            StructuredLookup::Role(v) => engine.search_by_role(v),
            StructuredLookup::MinExperience(years) => engine.search_by_experience(Some(*years), None),
        }
    }

    fn describe(&self) -> String {
        match self {
            StructuredLookup::Name(v) => format!("name \"{v}\""),
            StructuredLookup::Department(v) => format!("department \"{v}\""),
            StructuredLookup::Role(v) => format!("role \"{v}\""),
            StructuredLookup::MinExperience(years) => format!("at least {years} years of service"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub max_question_chars: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            max_question_chars: 2000,
        }
    }
}

/// Shared request handler. Table and index are immutable snapshots that can be
/// swapped wholesale; readers clone the current `Arc` and never see a partial update.
pub struct QueryService {
    engine: RwLock<Arc<StructuredQueryEngine>>,
    index: RwLock<Option<Arc<dyn EmbeddingIndex>>>,
    answerer: RetrievalAnswerer,
    settings: RouterSettings,
}

impl QueryService {
    pub fn new(
        engine: StructuredQueryEngine,
        index: Option<Arc<dyn EmbeddingIndex>>,
        answerer: RetrievalAnswerer,
        settings: RouterSettings,
    ) -> Self {
        Self {
            engine: RwLock::new(Arc::new(engine)),
            index: RwLock::new(index),
            answerer,
            settings,
        }
    }

    pub fn engine(&self) -> Arc<StructuredQueryEngine> {
        self.engine.read().clone()
    }

    pub fn index(&self) -> Option<Arc<dyn EmbeddingIndex>> {
        self.index.read().clone()
    }

    pub fn answerer(&self) -> &RetrievalAnswerer {
        &self.answerer
    }

    pub fn document_count(&self) -> usize {
        self.index().map(|i| i.len()).unwrap_or(0)
    }

    /// Both the table and the index loaded.
    pub fn is_ready(&self) -> bool {
        self.index().is_some() && self.engine().is_loaded()
    }

    pub fn install_engine(&self, engine: StructuredQueryEngine) {
        *self.engine.write() = Arc::new(engine);
    }

    pub fn install_index(&self, index: Arc<dyn EmbeddingIndex>) {
        info!(documents = index.len(), "installing vector index");
        *self.index.write() = Some(index);
    }

    /// Reloads the table; the previous snapshot stays in place on failure.
    pub fn reload_table(&self, path: &Path) -> Result<(), TableError> {
        let table = crate::table::load_table(path)?;
        self.install_engine(StructuredQueryEngine::new(table));
        info!(path = %path.display(), "employee table reloaded");
        Ok(())
    }

    pub async fn route(&self, question: &str, include_sources: bool) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidInput("question is empty".into()));
        }
        let length = question.chars().count();
        if length > self.settings.max_question_chars {
            return Err(QueryError::InvalidInput(format!(
                "question is {length} characters; the limit is {}",
                self.settings.max_question_chars
            )));
        }

        let engine = self.engine();
        let intent = engine.parse_intent(question);
        if let Some(lookup) = StructuredLookup::from_intent(&intent) {
            let records = lookup.run(&engine);
            if !records.is_empty() {
                debug!(?lookup, matches = records.len(), "answered from table");
                return Ok(structured_answer(&engine, &lookup, &records, include_sources));
            }
            debug!(?lookup, "structured lookup empty; falling back to retrieval");
        } else {
            debug!(keys = ?intent.keys(), "intent not decisive; using retrieval");
        }

        let index = self.index().ok_or(QueryError::IndexNotReady)?;
        self.answerer
            .answer(index.as_ref(), question, include_sources)
            .await
    }
}

fn structured_answer(
    engine: &StructuredQueryEngine,
    lookup: &StructuredLookup,
    records: &[EmployeeRecord],
    include_sources: bool,
) -> Answer {
    let noun = if records.len() == 1 { "employee" } else { "employees" };
    let mut text = format!(
        "Found {} {noun} matching {}:",
        records.len(),
        lookup.describe()
    );
    for record in records.iter().take(MAX_LISTED) {
        text.push_str("\n- ");
        text.push_str(&describe_record(record));
    }
    if records.len() > MAX_LISTED {
        text.push_str(&format!("\n... and {} more", records.len() - MAX_LISTED));
    }

    let sources = include_sources.then(|| {
        records
            .iter()
            .filter_map(|r| row_document(engine.table(), r.row_index))
            .collect::<Vec<_>>()
    });
    Answer {
        text,
        confidence: include_sources.then_some(1.0),
        sources,
        route: AnswerRoute::Structured,
    }
}

fn describe_record(record: &EmployeeRecord) -> String {
    let mut line = record
        .text(NAME_COLUMN)
        .unwrap_or_else(|| format!("Row {}", record.row_index));
    let details: Vec<String> = [DEPARTMENT_COLUMN, TITLE_COLUMN]
        .iter()
        .filter_map(|c| record.text(c))
        .collect();
    if !details.is_empty() {
        line.push_str(&format!(" ({})", details.join(", ")));
    }
    if let Some(email) = record.text(EMAIL_COLUMN) {
        line.push_str(&format!(" <{email}>"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answerer::{AnswererSettings, RetrievalAnswerer};
    use crate::intent::parse_intent;
    use crate::models::CellValue;
    use crate::table::Table;
    use providers::noop::NoopProvider;
    use std::time::Duration;

    #[test]
    fn single_key_intents_resolve() {
        assert_eq!(
            StructuredLookup::from_intent(&parse_intent("Find Alice")),
            Some(StructuredLookup::Name("alice".into()))
        );
        assert_eq!(
            StructuredLookup::from_intent(&parse_intent("who works in the sales department")),
            Some(StructuredLookup::Department("the sales".into()))
        );
        assert_eq!(
            StructuredLookup::from_intent(&parse_intent("anyone with 5 years experience")),
            None
        );
    }

    #[test]
    fn ambiguous_or_seniority_only_intents_do_not_resolve() {
        assert_eq!(
            StructuredLookup::from_intent(&parse_intent("Find John in Sales department")),
            None
        );
        assert_eq!(StructuredLookup::from_intent(&parse_intent("list senior staff")), None);
        assert_eq!(StructuredLookup::from_intent(&parse_intent("hello")), None);
    }

    #[test]
    fn reload_swaps_in_the_new_table() {
        let old = Table::new(
            vec!["Name".into()],
            vec![vec![Some(CellValue::Text("Zed Old".into()))]],
        );
        let answerer = RetrievalAnswerer::new(
            Arc::new(NoopProvider),
            Arc::new(NoopProvider),
            AnswererSettings {
                k: 3,
                timeout: Duration::from_secs(1),
            },
        );
        let service = QueryService::new(
            StructuredQueryEngine::new(old),
            None,
            answerer,
            RouterSettings::default(),
        );
        let before = service.engine();

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("staff.xlsx");
        crate::test_support::write_staff_workbook(&path);
        service.reload_table(&path).unwrap();

        let engine = service.engine();
        assert_eq!(engine.records().len(), 2);
        assert_eq!(engine.search_by_name("bob").len(), 1);
        assert!(engine.search_by_name("zed").is_empty());
        // Readers holding the previous snapshot keep it.
        assert_eq!(before.search_by_name("zed").len(), 1);
    }
}
