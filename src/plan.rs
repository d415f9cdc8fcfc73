//! Query plans and the parser that turns model output into them.
//!
//! The document emitted by the plan generator is machine written but not
//! trusted. [`parse`] accepts a JSON object (optionally wrapped in a Markdown
//! code fence) and either yields a [`QueryPlan`] or one of the closed set of
//! [`ParseError`] kinds. Small defects are repaired instead of rejected, and
//! every repair is reported as a [`Coercion`].
//!
//! ```
//! use scriptlink::plan::{parse, Intent, Operator};
//! let parsed = parse(r#"{"intent": "count", "filters": [
//!     {"field": "form name", "operator": "like", "value": "Demographics"}]}"#).unwrap();
//! assert_eq!(parsed.plan.intent, Intent::Count);
//! assert_eq!(parsed.plan.filters[0].operator, Operator::Equals);
//! assert_eq!(parsed.coercions.len(), 1);
//! ```
//!
//! Field names are left as the model wrote them; they are resolved against the
//! dataset only when the plan is executed.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::warn;

use crate::error::ParseError;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*(.*?)\s*```\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Lookup,
    FilterList,
    Count,
    UniqueList,
    SmallTalk,
    FollowUp,
    Unknown,
}

impl Intent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "lookup" => Some(Self::Lookup),
            "filter_list" => Some(Self::FilterList),
            "count" => Some(Self::Count),
            "unique_list" => Some(Self::UniqueList),
            "small_talk" => Some(Self::SmallTalk),
            "follow_up" => Some(Self::FollowUp),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::FilterList => "filter_list",
            Self::Count => "count",
            Self::UniqueList => "unique_list",
            Self::SmallTalk => "small_talk",
            Self::FollowUp => "follow_up",
            Self::Unknown => "unknown",
        }
    }
    /// Intents the executor knows how to run.
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Lookup | Self::FilterList | Self::Count | Self::UniqueList)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    NotEquals,
}

impl Operator {
    // `exact` and `not_exact` are older spellings the generator still emits
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "equals" | "exact" => Some(Self::Equals),
            "contains" => Some(Self::Contains),
            "not_equals" | "not_exact" => Some(Self::NotEquals),
            _ => None,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::NotEquals => "not_equals",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `(field, operator, value)` constraint. `field` is a conceptual name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self { field: field.into(), operator, value: value.into() }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.field, self.operator, self.value)
    }
}

/// One user intent. `filters` is always present; no constraints is an empty
/// vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub intent: Intent,
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Count distinct non-empty target values instead of rows. `None` when
    /// the plan does not say, so a follow-up can tell "off" from "not stated".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Explanation attached to an `unknown` plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QueryPlan {
    pub fn new(intent: Intent) -> Self {
        Self { intent, filters: Vec::new(), target_field: None, limit: None, distinct: None, reason: None }
    }
    pub fn with_filter(mut self, field: &str, operator: Operator, value: &str) -> Self {
        self.filters.push(Filter::new(field, operator, value));
        self
    }
    pub fn with_target(mut self, target: &str) -> Self {
        self.target_field = Some(target.to_string());
        self
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = Some(distinct);
        self
    }
    pub fn is_distinct(&self) -> bool {
        self.distinct.unwrap_or(false)
    }
}

/// A repair applied while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coercion {
    UnknownOperator { index: usize, operator: String },
    UnknownIntent(String),
    InvalidLimit(String),
    DroppedSmallTalkConstraints,
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coercion::UnknownOperator { index, operator } => {
                write!(f, "filter {index}: operator '{operator}' replaced by equals")
            }
            Coercion::UnknownIntent(intent) => write!(f, "intent '{intent}' replaced by unknown"),
            Coercion::InvalidLimit(limit) => write!(f, "limit '{limit}' ignored"),
            Coercion::DroppedSmallTalkConstraints => write!(f, "small talk constraints dropped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlan {
    pub plan: QueryPlan,
    pub coercions: Vec<Coercion>,
}

/// Parses one raw plan document.
pub fn parse(raw: &str) -> Result<ParsedPlan, ParseError> {
    let body = match CODE_FENCE.captures(raw) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
        None => raw.trim(),
    };
    let document: Json = serde_json::from_str(body).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let record = document
        .as_object()
        .ok_or_else(|| ParseError::Malformed("plan is not an object".into()))?;

    let mut coercions = Vec::new();
    let intent = match record.get("intent") {
        None | Some(Json::Null) => return Err(ParseError::MissingIntent),
        Some(Json::String(name)) => Intent::from_name(name).unwrap_or_else(|| {
            coercions.push(Coercion::UnknownIntent(name.clone()));
            Intent::Unknown
        }),
        Some(other) => return Err(ParseError::Malformed(format!("intent must be a string, got {other}"))),
    };

    // only small talk may leave the list out; every other plan states it, even if empty
    let filters = match record.get("filters") {
        None | Some(Json::Null) if intent == Intent::SmallTalk => Vec::new(),
        None | Some(Json::Null) => return Err(ParseError::Malformed("filters missing".into())),
        Some(Json::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_filter(index, item, &mut coercions))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ParseError::Malformed("filters must be a list".into())),
    };

    let mut plan = QueryPlan {
        intent,
        filters,
        target_field: optional_text(record, "target_field")?,
        limit: parse_limit(record.get("limit"), &mut coercions),
        distinct: optional_flag(record, "distinct")?,
        reason: optional_text(record, "reason")?,
    };

    if plan.intent == Intent::SmallTalk
        && (!plan.filters.is_empty() || plan.target_field.is_some() || plan.limit.is_some())
    {
        plan.filters.clear();
        plan.target_field = None;
        plan.limit = None;
        coercions.push(Coercion::DroppedSmallTalkConstraints);
    }

    for coercion in &coercions {
        warn!(%coercion, intent = %plan.intent, "plan coerced");
    }
    Ok(ParsedPlan { plan, coercions })
}

fn parse_filter(index: usize, item: &Json, coercions: &mut Vec<Coercion>) -> Result<Filter, ParseError> {
    let entry = item
        .as_object()
        .ok_or_else(|| ParseError::Malformed(format!("filter {index} is not an object")))?;
    let field = match entry.get("field") {
        Some(Json::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(ParseError::Malformed(format!("filter {index} has no field"))),
    };
    let value = match entry.get("value") {
        Some(Json::String(s)) => s.trim().to_string(),
        Some(n @ Json::Number(_)) => crate::dataset::Value::from(n.clone()).normalized(),
        Some(Json::Bool(b)) => b.to_string(),
        _ => return Err(ParseError::Malformed(format!("filter {index} has no value"))),
    };
    let operator = match entry.get("operator") {
        Some(Json::String(name)) => Operator::from_name(name).unwrap_or_else(|| {
            coercions.push(Coercion::UnknownOperator { index, operator: name.clone() });
            Operator::Equals
        }),
        other => {
            let shown = other.map_or_else(|| "<missing>".to_string(), Json::to_string);
            coercions.push(Coercion::UnknownOperator { index, operator: shown });
            Operator::Equals
        }
    };
    Ok(Filter { field, operator, value })
}

fn optional_text(record: &Map<String, Json>, key: &str) -> Result<Option<String>, ParseError> {
    match record.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Json::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(ParseError::Malformed(format!("{key} must be a string, got {other}"))),
    }
}

fn optional_flag(record: &Map<String, Json>, key: &str) -> Result<Option<bool>, ParseError> {
    match record.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ParseError::Malformed(format!("{key} must be true or false, got {other}"))),
    }
}

fn parse_limit(limit: Option<&Json>, coercions: &mut Vec<Coercion>) -> Option<usize> {
    match limit {
        None | Some(Json::Null) => None,
        Some(json) => match json.as_u64() {
            Some(n) if n > 0 => Some(n as usize),
            _ => {
                coercions.push(Coercion::InvalidLimit(json.to_string()));
                None
            }
        },
    }
}
