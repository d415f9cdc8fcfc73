//! Conversational state carried between turns of one session.
//!
//! A session remembers the last plan it executed together with a compact
//! summary of what that plan returned. Elliptical follow-ups ("how many?",
//! "and for service X?") are completed by overlaying the new plan onto the
//! remembered one. Context is advisory: whatever the current turn states
//! explicitly wins over what it inherits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::alias::{normalize, AliasResolver, ColumnHasher};
use crate::error::{Result, ScriptlinkError};
use crate::plan::{Filter, Intent, QueryPlan};

/// What the last executed plan produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub row_count: usize,
    /// Distinct target values, in first-seen order.
    pub target_values: Vec<String>,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    pub plan: QueryPlan,
    pub summary: ResultSummary,
}

/// The entity a follow-up most likely refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextHint {
    pub field: String,
    pub value: String,
}

impl ConversationContext {
    pub fn new(plan: QueryPlan, summary: ResultSummary) -> Self {
        Self { plan, summary }
    }

    /// A single returned target value beats the first filter, since that is
    /// what "it" or "that script" points at after a one-row answer.
    pub fn hint(&self) -> Option<ContextHint> {
        if let (Some(target), [value]) = (&self.plan.target_field, self.summary.target_values.as_slice()) {
            return Some(ContextHint { field: target.clone(), value: value.clone() });
        }
        self.summary
            .filters
            .first()
            .map(|f| ContextHint { field: f.field.clone(), value: f.value.clone() })
    }
}

/// A plan after merging with prior context.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePlan {
    pub plan: QueryPlan,
    /// Something was taken over from the prior turn.
    pub inherited: bool,
    /// A follow-up arrived with nothing to follow.
    pub no_context: bool,
}

impl EffectivePlan {
    pub fn fresh(plan: QueryPlan) -> Self {
        Self { plan, inherited: false, no_context: false }
    }
}

/// Merges `current` with `prior`, comparing filter fields by normalized term.
pub fn merge(current: QueryPlan, prior: Option<&ConversationContext>) -> EffectivePlan {
    merge_by(current, prior, normalize)
}

/// Like [`merge`], but two terms naming the same column ("form", "Form Name")
/// count as the same field.
pub fn merge_resolved(
    current: QueryPlan,
    prior: Option<&ConversationContext>,
    aliases: &AliasResolver,
) -> EffectivePlan {
    merge_by(current, prior, |field| match aliases.resolve(field) {
        Some(column) => format!("column:{column}"),
        None => format!("term:{}", normalize(field)),
    })
}

fn is_elliptical(plan: &QueryPlan) -> bool {
    plan.intent == Intent::FollowUp || (plan.filters.is_empty() && plan.intent != Intent::SmallTalk)
}

fn merge_by<K>(current: QueryPlan, prior: Option<&ConversationContext>, key: K) -> EffectivePlan
where
    K: Fn(&str) -> String,
{
    if !is_elliptical(&current) {
        return EffectivePlan::fresh(current);
    }
    let Some(context) = prior else {
        let no_context = current.intent == Intent::FollowUp;
        return EffectivePlan { plan: current, inherited: false, no_context };
    };
    let prior_plan = &context.plan;

    let overridden: Vec<String> = current.filters.iter().map(|f| key(&f.field)).collect();
    let mut filters: Vec<Filter> = prior_plan
        .filters
        .iter()
        .filter(|f| !overridden.contains(&key(&f.field)))
        .cloned()
        .collect();
    let dropped = prior_plan.filters.len() - filters.len();
    filters.extend(current.filters);

    let intent = if current.intent == Intent::FollowUp { prior_plan.intent } else { current.intent };
    let plan = QueryPlan {
        intent,
        filters,
        target_field: current.target_field.or_else(|| prior_plan.target_field.clone()),
        limit: current.limit.or(prior_plan.limit),
        distinct: current.distinct.or(prior_plan.distinct),
        reason: current.reason,
    };
    debug!(intent = %plan.intent, filters = plan.filters.len(), overridden = dropped, "merged with prior context");
    EffectivePlan { plan, inherited: true, no_context: false }
}

/// One session's slot. Holding its lock serializes the session's turns.
pub type SessionSlot = Arc<Mutex<Option<ConversationContext>>>;

/// Per-session contexts. Sessions never see each other's state.
#[derive(Debug, Default)]
pub struct ContextStore {
    sessions: Mutex<HashMap<String, SessionSlot, ColumnHasher>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<String, SessionSlot, ColumnHasher>>> {
        self.sessions.lock().map_err(|e| ScriptlinkError::Lock(e.to_string()))
    }

    /// The slot for `session`, created empty on first use.
    pub fn session(&self, session: &str) -> Result<SessionSlot> {
        let mut sessions = self.sessions()?;
        Ok(Arc::clone(sessions.entry(session.to_string()).or_default()))
    }

    /// Forgets `session` if it has no context and no turn is using its slot.
    /// Returns whether the slot was dropped.
    pub fn release_if_empty(&self, session: &str) -> Result<bool> {
        let mut sessions = self.sessions()?;
        // the map's own reference is the only one when no turn holds the slot
        let idle_and_empty = sessions
            .get(session)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|c| c.is_none()));
        if idle_and_empty {
            sessions.remove(session);
        }
        Ok(idle_and_empty)
    }

    /// Ends a conversation, dropping its context. Returns whether it existed.
    pub fn end(&self, session: &str) -> Result<bool> {
        Ok(self.sessions()?.remove(session).is_some())
    }

    /// A copy of the session's current context.
    pub fn snapshot(&self, session: &str) -> Result<Option<ConversationContext>> {
        let slot = match self.sessions()?.get(session) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(None),
        };
        let context = slot.lock().map_err(|e| ScriptlinkError::Lock(e.to_string()))?;
        Ok(context.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.sessions()?.len())
    }
}
