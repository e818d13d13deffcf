//! Rule-based extraction of query parameters from free text.
//!
//! Each extractor runs on its own against the lower-cased input and keeps the
//! first capture of its first match. Several extractors may fire on the same
//! text; overlaps are reported as-is and never reconciled here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKey {
    Department,
    Role,
    Experience,
    Seniority,
    Name,
}

static EXTRACTORS: Lazy<Vec<(IntentKey, Regex)>> = Lazy::new(|| {
    [
        (
            IntentKey::Department,
            r"(?:in|from|of|at)\s+(\w+(?:\s+\w+)*?)\s+(?:department|dept)",
        ),
        (
            IntentKey::Role,
            r"(?:as|with|title|role)\s+(?:of\s+)?(\w+(?:\s+\w+)*?)(?:\s+in|\s+at|$)",
        ),
        (
            IntentKey::Experience,
            r"(\d+)\s*(?:years?|yrs?)\s*(?:of\s+)?(?:experience|exp)",
        ),
        (
            IntentKey::Seniority,
            r"(senior|junior|mid-level|new|experienced)",
        ),
        // The name stops before a trailing qualifier ("in sales department") or punctuation.
        (
            IntentKey::Name,
            r"(?:find|search|who\s+is)\s+(\w+(?:\s+\w+)*?)(?:\s+(?:in|from|at|of|with|as|who|that|department|dept)\b|\s*[?.!,;]|\s*$)",
        ),
    ]
    .into_iter()
    .map(|(key, pattern)| (key, Regex::new(pattern).expect("intent pattern compiles")))
    .collect()
});

/// Extracted parameters; `None` means the extractor did not match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ParsedIntent {
    pub fn get(&self, key: IntentKey) -> Option<&str> {
        match key {
            IntentKey::Department => self.department.as_deref(),
            IntentKey::Role => self.role.as_deref(),
            IntentKey::Experience => self.experience.as_deref(),
            IntentKey::Seniority => self.seniority.as_deref(),
            IntentKey::Name => self.name.as_deref(),
        }
    }

    fn set(&mut self, key: IntentKey, value: String) {
        let slot = match key {
            IntentKey::Department => &mut self.department,
            IntentKey::Role => &mut self.role,
            IntentKey::Experience => &mut self.experience,
            IntentKey::Seniority => &mut self.seniority,
            IntentKey::Name => &mut self.name,
        };
        *slot = Some(value);
    }

    /// Keys that matched, in extractor order.
    pub fn keys(&self) -> Vec<IntentKey> {
        [
            IntentKey::Department,
            IntentKey::Role,
            IntentKey::Experience,
            IntentKey::Seniority,
            IntentKey::Name,
        ]
        .into_iter()
        .filter(|k| self.get(*k).is_some())
        .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn parse_intent(text: &str) -> ParsedIntent {
    let lowered = text.to_lowercase();
    let mut intent = ParsedIntent::default();
    for (key, re) in EXTRACTORS.iter() {
        let value = re
            .captures(&lowered)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            intent.set(*key, value);
        }
    }
    intent
}
