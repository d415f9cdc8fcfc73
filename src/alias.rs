//! Conceptual field names ("form name", "Script") mapped onto the columns
//! the dataset actually has. Resolution is a pure lookup after normalization;
//! there is no fuzzy matching.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasherDefault;

use lazy_static::lazy_static;
use regex::Regex;
use seahash::SeaHasher;
use tracing::{debug, warn};

pub type ColumnHasher = BuildHasherDefault<SeaHasher>;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_]+").unwrap();
}

/// Lowercase, trim, and fold runs of whitespace/underscores into one space.
pub fn normalize(term: &str) -> String {
    SEPARATORS.replace_all(term.trim(), " ").trim().to_lowercase()
}

// used when matching alias spellings against real headers, "Form Name" ~ "FormName"
fn compact(term: &str) -> String {
    SEPARATORS.replace_all(term, "").to_lowercase()
}

/// The alias table. Every normalized term maps to at most one column.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    kept: HashMap<String, String, ColumnHasher>,
    concepts: Vec<String>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table for a concrete set of columns. Each column resolves to
    /// itself. For each concept, the first spelling matching a column header
    /// (ignoring case, spaces and underscores) binds the concept name and all
    /// of its spellings to that column.
    pub fn discover(columns: &[String], concepts: &BTreeMap<String, Vec<String>>) -> Self {
        let mut resolver = Self::new();
        for column in columns {
            resolver.insert(column, column);
        }
        for (concept, spellings) in concepts {
            let bound = std::iter::once(concept)
                .chain(spellings.iter())
                .find_map(|spelling| columns.iter().find(|c| compact(c) == compact(spelling)));
            match bound {
                Some(column) => {
                    let column = column.clone();
                    resolver.insert(concept, &column);
                    for spelling in spellings {
                        resolver.insert(spelling, &column);
                    }
                    resolver.concepts.push(normalize(concept));
                    debug!(concept = %concept, column = %column, "alias bound");
                }
                None => {
                    warn!(concept = %concept, "no column matches any spelling of concept");
                }
            }
        }
        resolver
    }

    /// Binds `term` to `column`. Returns false when the term is already bound
    /// to a different column, in which case the first binding is kept.
    pub fn insert(&mut self, term: &str, column: &str) -> bool {
        let key = normalize(term);
        if key.is_empty() {
            return false;
        }
        match self.kept.get(&key) {
            Some(existing) if existing != column => {
                warn!(term = %key, existing = %existing, ignored = %column, "alias already bound");
                false
            }
            Some(_) => true,
            None => {
                self.kept.insert(key, column.to_string());
                true
            }
        }
    }

    pub fn resolve(&self, term: &str) -> Option<&str> {
        self.kept.get(&normalize(term)).map(String::as_str)
    }

    /// Conceptual names that were bound during discovery, in binding order.
    pub fn concepts(&self) -> &[String] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// The spellings the EHR spreadsheet has been seen to use.
pub fn default_concepts() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 5] = [
        ("form name", &["FormName", "Form Name", "Form", "Forms", "EHR Form"]),
        ("script name", &["ScriptName", "Script Name", "Script", "Scripts", "EHR Script"]),
        (
            "field name",
            &["FieldName", "Field Name", "Field", "Fields", "Form Field", "EHR Field", "Field_Name", "Field_ID"],
        ),
        ("service name", &["ServiceName", "Service Name", "Service", "Services", "EHR Service"]),
        ("namespace", &["Namespace", "Namespaces", "Env", "Environment"]),
    ];
    table
        .iter()
        .map(|(concept, spellings)| {
            (concept.to_string(), spellings.iter().map(|s| s.to_string()).collect())
        })
        .collect()
}
