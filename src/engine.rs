//! One conversational turn, end to end.
//!
//! The [`Engine`] owns the shared, read-only dataset and the alias table plus
//! the per-session contexts. A turn runs synchronously:
//! small-talk check → plan → parse → merge → execute → format. Each of the
//! recoverable failures (unparseable or missing plan, unknown field, follow-up
//! without context) ends the turn with a clarifying reply; none of them leaves
//! the engine.
//!
//! Turns of the same session are serialized: the session's context lock is
//! held for the whole turn, so a turn never observes a half-updated context.
//! A session is remembered from its first answered turn until it is ended;
//! turns that answer nothing leave no trace in the store.

use std::sync::Arc;
use std::time::Instant;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::alias::AliasResolver;
use crate::context::{merge_resolved, ContextHint, ContextStore, ConversationContext, SessionSlot};
use crate::dataset::Dataset;
use crate::error::{ExecutionError, ParseError, Result, ScriptlinkError};
use crate::executor::{execute, ResultSet};
use crate::format::{Formatter, Reply};
use crate::plan::{parse, Coercion, Intent, QueryPlan};
use crate::settings::Settings;
use crate::smalltalk::{self, SmallTalk};

const REPEAT_COMMANDS: [&str; 3] = ["what was that again", "show that again", "repeat that"];

lazy_static! {
    // a bare follow-up phrased like this asks for a count of the prior rows
    static ref COUNT_CUE: Regex = Regex::new(r"(?i)\b(how many|count|number of)\b").unwrap();
}

/// The external collaborator that turns user text into a raw plan document,
/// typically a language model. Its failures are opaque to the engine.
pub trait PlanSource {
    fn generate(&self, message: &str, hint: Option<&ContextHint>) -> std::result::Result<String, String>;
}

/// How a turn ended.
#[derive(Debug)]
pub enum Outcome {
    SmallTalk(SmallTalk),
    Answered(ResultSet),
    /// The plan generator declared the question unanswerable.
    Unanswerable,
    /// A recoverable failure, answered with a clarification.
    Recovered(ScriptlinkError),
}

#[derive(Debug)]
pub struct Turn {
    pub reply: Reply,
    pub outcome: Outcome,
    /// The effective plan, when one was reached.
    pub plan: Option<QueryPlan>,
    pub coercions: Vec<Coercion>,
}

impl Turn {
    fn new(reply: Reply, outcome: Outcome) -> Self {
        Self { reply, outcome, plan: None, coercions: Vec::new() }
    }
}

pub struct Engine {
    dataset: Arc<Dataset>,
    aliases: AliasResolver,
    formatter: Formatter,
    contexts: ContextStore,
}

impl Engine {
    pub fn new(dataset: Arc<Dataset>, aliases: AliasResolver, formatter: Formatter) -> Self {
        Self { dataset, aliases, formatter, contexts: ContextStore::new() }
    }

    /// Discovers aliases for the dataset's headers from the configured spellings.
    pub fn from_settings(dataset: Arc<Dataset>, settings: &Settings) -> Self {
        let aliases = AliasResolver::discover(dataset.columns(), &settings.aliases);
        info!(columns = dataset.columns().len(), rows = dataset.len(), aliases = aliases.len(), "engine ready");
        Self::new(dataset, aliases, Formatter::new(settings.display.clone()))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
    pub fn aliases(&self) -> &AliasResolver {
        &self.aliases
    }
    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// What the session's last answer was about, for the plan generator.
    pub fn context_hint(&self, session: &str) -> Result<Option<ContextHint>> {
        Ok(self.contexts.snapshot(session)?.and_then(|c| c.hint()))
    }

    pub fn end_session(&self, session: &str) -> Result<bool> {
        self.contexts.end(session)
    }

    /// Runs a turn whose raw plan, if any, was produced upstream.
    pub fn respond(&self, session: &str, message: &str, plan: Option<&str>) -> Result<Turn> {
        self.turn(session, message, |_| match plan {
            Some(raw) => Ok(raw.to_string()),
            None => Err(ParseError::NoPlanAvailable("no plan supplied".into())),
        })
    }

    /// Runs a turn, asking `source` for a plan only when one is needed.
    pub fn respond_with(&self, session: &str, message: &str, source: &dyn PlanSource) -> Result<Turn> {
        self.turn(session, message, |hint| {
            source.generate(message, hint.as_ref()).map_err(ParseError::NoPlanAvailable)
        })
    }

    fn turn<F>(&self, session: &str, message: &str, produce: F) -> Result<Turn>
    where
        F: FnOnce(Option<ContextHint>) -> std::result::Result<String, ParseError>,
    {
        let started = Instant::now();
        if let Some(kind) = smalltalk::detect(message) {
            debug!(session, "small talk short-circuit");
            return Ok(Turn::new(self.formatter.small_talk(kind), Outcome::SmallTalk(kind)));
        }

        let slot = self.contexts.session(session)?;
        let turn = self.locked_turn(&slot, session, message, produce, started);
        drop(slot);
        // sessions that never got an answer are not kept around
        self.contexts.release_if_empty(session)?;
        turn
    }

    fn locked_turn<F>(&self, slot: &SessionSlot, session: &str, message: &str, produce: F, started: Instant) -> Result<Turn>
    where
        F: FnOnce(Option<ContextHint>) -> std::result::Result<String, ParseError>,
    {
        let mut context = slot.lock().map_err(|e| ScriptlinkError::Lock(e.to_string()))?;

        if is_repeat(message) {
            if let Some(previous) = context.as_ref() {
                let plan = previous.plan.clone();
                debug!(session, intent = %plan.intent, "repeating last plan");
                return Ok(self.run(session, plan, Vec::new(), &mut context, started));
            }
        }

        let hint = context.as_ref().and_then(ConversationContext::hint);
        let parsed = match produce(hint).and_then(|raw| parse(&raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(session, error = %e, "no usable plan");
                return Ok(Turn::new(self.formatter.clarify(), Outcome::Recovered(e.into())));
            }
        };

        if parsed.plan.intent == Intent::SmallTalk {
            let kind = smalltalk::detect(message).unwrap_or(SmallTalk::Other);
            let mut turn = Turn::new(self.formatter.small_talk(kind), Outcome::SmallTalk(kind));
            turn.coercions = parsed.coercions;
            return Ok(turn);
        }

        let asks_count = parsed.plan.intent == Intent::FollowUp
            && parsed.plan.target_field.is_none()
            && COUNT_CUE.is_match(message);
        let mut effective = merge_resolved(parsed.plan, context.as_ref(), &self.aliases);
        if effective.no_context {
            warn!(session, "follow-up without prior context");
            let mut turn = Turn::new(self.formatter.no_context(), Outcome::Recovered(ScriptlinkError::NoContextAvailable));
            turn.plan = Some(effective.plan);
            turn.coercions = parsed.coercions;
            return Ok(turn);
        }
        if asks_count && effective.plan.intent != Intent::Count {
            debug!(session, prior = %effective.plan.intent, "follow-up asks for a count");
            effective.plan.intent = Intent::Count;
        }
        Ok(self.run(session, effective.plan, parsed.coercions, &mut context, started))
    }

    fn run(
        &self,
        session: &str,
        plan: QueryPlan,
        coercions: Vec<Coercion>,
        context: &mut Option<ConversationContext>,
        started: Instant,
    ) -> Turn {
        let (reply, outcome) = if plan.intent == Intent::Unknown {
            (self.formatter.unanswerable(plan.reason.as_deref()), Outcome::Unanswerable)
        } else {
            match execute(&plan, &self.dataset, &self.aliases) {
                Ok(result) => {
                    *context = Some(ConversationContext::new(plan.clone(), result.summary(&plan)));
                    (self.formatter.render(&result), Outcome::Answered(result))
                }
                Err(ExecutionError::UnknownField(field)) => {
                    warn!(session, field = %field, "unknown field");
                    let reply = self.formatter.unknown_field(&field, self.aliases.concepts());
                    (reply, Outcome::Recovered(ExecutionError::UnknownField(field).into()))
                }
                Err(e) => {
                    warn!(session, error = %e, "plan not executable");
                    (self.formatter.clarify(), Outcome::Recovered(e.into()))
                }
            }
        };
        let rows = match &outcome {
            Outcome::Answered(result) => result.total,
            _ => 0,
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(session, intent = %plan.intent, rows, ms = elapsed_ms, "turn complete");
        Turn { reply, outcome, plan: Some(plan), coercions }
    }
}

fn is_repeat(message: &str) -> bool {
    let message = message.trim().trim_end_matches(['?', '.', '!']).trim_end().to_lowercase();
    REPEAT_COMMANDS.contains(&message.as_str())
}
