//! Runs an effective plan against the dataset.
//!
//! Every field a plan mentions is resolved before any row is looked at, so a
//! plan naming an unknown field fails as a whole instead of filtering on the
//! fields it happens to know. Surviving rows are tracked as a bitmap of row
//! numbers; each filter narrows it further (logical AND), which keeps the
//! outcome independent of filter order.

use std::collections::HashSet;

use roaring::RoaringTreemap;
use serde::Serialize;
use tracing::debug;

use crate::alias::AliasResolver;
use crate::context::ResultSummary;
use crate::dataset::{comparable, Dataset, Row, Value};
use crate::error::ExecutionError;
use crate::plan::{Filter, Intent, Operator, QueryPlan};

/// How the formatter should present a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Count,
    List,
    Single,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub tag: Tag,
    /// Projected column identifiers, empty for counts.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// The count for [`Tag::Count`], otherwise the number of rows before `limit`.
    pub total: usize,
    /// Rows that satisfied every filter.
    pub matched: usize,
    /// Whether `limit` cut rows off.
    pub limited: bool,
    /// Distinct non-blank values of the target column among matched rows.
    pub target_values: Vec<String>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }

    pub fn summary(&self, plan: &QueryPlan) -> ResultSummary {
        ResultSummary {
            row_count: self.matched,
            target_values: self.target_values.clone(),
            filters: plan.filters.clone(),
        }
    }
}

struct Predicate {
    column: usize,
    operator: Operator,
    needle: String,
}

impl Predicate {
    fn matches(&self, row: &Row) -> bool {
        let cell = row[self.column].comparable();
        match self.operator {
            Operator::Equals => cell == self.needle,
            Operator::Contains => cell.contains(&self.needle),
            Operator::NotEquals => cell != self.needle,
        }
    }
}

fn resolve_column(field: &str, dataset: &Dataset, aliases: &AliasResolver) -> Result<usize, ExecutionError> {
    aliases
        .resolve(field)
        .and_then(|column| dataset.column_index(column))
        .ok_or_else(|| ExecutionError::UnknownField(field.to_string()))
}

fn compile(filter: &Filter, dataset: &Dataset, aliases: &AliasResolver) -> Result<Predicate, ExecutionError> {
    Ok(Predicate {
        column: resolve_column(&filter.field, dataset, aliases)?,
        operator: filter.operator,
        needle: comparable(&filter.value),
    })
}

/// Row numbers satisfying every predicate, in dataset order.
fn survivors(dataset: &Dataset, predicates: &[Predicate]) -> RoaringTreemap {
    let mut survivors = RoaringTreemap::new();
    survivors.insert_range(0..dataset.len() as u64);
    for predicate in predicates {
        if survivors.is_empty() {
            break;
        }
        let matching: RoaringTreemap = survivors
            .iter()
            .filter(|&r| dataset.row(r as usize).is_some_and(|row| predicate.matches(row)))
            .collect();
        survivors &= matching;
    }
    survivors
}

fn distinct_values<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_blank())
        .map(Value::normalized)
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

pub fn execute(plan: &QueryPlan, dataset: &Dataset, aliases: &AliasResolver) -> Result<ResultSet, ExecutionError> {
    if !plan.intent.is_executable() {
        return Err(ExecutionError::NotExecutable(plan.intent));
    }
    let predicates = plan
        .filters
        .iter()
        .map(|f| compile(f, dataset, aliases))
        .collect::<Result<Vec<_>, _>>()?;
    let target = plan
        .target_field
        .as_deref()
        .map(|field| resolve_column(field, dataset, aliases))
        .transpose()?;

    let matched_rows: Vec<&Row> = survivors(dataset, &predicates)
        .iter()
        .filter_map(|r| dataset.row(r as usize))
        .collect();
    let matched = matched_rows.len();
    let target_values = match target {
        Some(column) => distinct_values(matched_rows.iter().map(|&row| &row[column])),
        None => Vec::new(),
    };
    debug!(intent = %plan.intent, filters = predicates.len(), matched, "plan executed");

    if plan.intent == Intent::Count {
        let total = if plan.is_distinct() && target.is_some() { target_values.len() } else { matched };
        return Ok(ResultSet {
            tag: Tag::Count,
            columns: Vec::new(),
            rows: Vec::new(),
            total,
            matched,
            limited: false,
            target_values,
        });
    }

    let projection: Vec<usize> = match target {
        Some(column) => vec![column],
        None => (0..dataset.columns().len()).collect(),
    };
    let columns: Vec<String> = projection.iter().map(|&c| dataset.columns()[c].clone()).collect();
    let projected = matched_rows
        .iter()
        .map(|row| projection.iter().map(|&c| row[c].clone()).collect::<Row>());
    let mut rows: Vec<Row> = if plan.intent == Intent::UniqueList {
        let mut seen = HashSet::new();
        projected
            .filter(|row| seen.insert(row.iter().map(Value::normalized).collect::<Vec<_>>()))
            .collect()
    } else {
        projected.collect()
    };

    let total = rows.len();
    let limited = plan.limit.is_some_and(|limit| limit < total);
    if let Some(limit) = plan.limit {
        rows.truncate(limit);
    }
    let tag = if plan.intent == Intent::Lookup && rows.len() == 1 { Tag::Single } else { Tag::List };
    Ok(ResultSet { tag, columns, rows, total, matched, limited, target_values })
}
