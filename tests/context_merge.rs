mod common;

use scriptlink::context::{merge, merge_resolved, ContextHint, ContextStore, ConversationContext, ResultSummary};
use scriptlink::plan::{Filter, Intent, Operator, QueryPlan};

fn prior(plan: QueryPlan, target_values: &[&str]) -> ConversationContext {
    let summary = ResultSummary {
        row_count: target_values.len(),
        target_values: target_values.iter().map(|v| v.to_string()).collect(),
        filters: plan.filters.clone(),
    };
    ConversationContext::new(plan, summary)
}

fn demographics_scripts() -> ConversationContext {
    let plan = QueryPlan::new(Intent::FilterList)
        .with_filter("form name", Operator::Equals, "Demographics")
        .with_target("script name");
    prior(plan, &["A", "B"])
}

#[test]
fn follow_up_narrows_prior_filters() {
    let context = demographics_scripts();
    let current = QueryPlan::new(Intent::FollowUp).with_filter("service", Operator::Equals, "Registration");
    let effective = merge(current, Some(&context));
    assert!(effective.inherited);
    assert!(!effective.no_context);
    assert_eq!(effective.plan.intent, Intent::FilterList, "follow-up reruns the prior intent");
    assert_eq!(
        effective.plan.filters,
        vec![
            Filter::new("form name", Operator::Equals, "Demographics"),
            Filter::new("service", Operator::Equals, "Registration"),
        ]
    );
    assert_eq!(effective.plan.target_field.as_deref(), Some("script name"));
}

#[test]
fn empty_filters_inherit_prior_constraints() {
    let context = demographics_scripts();
    let effective = merge(QueryPlan::new(Intent::Count), Some(&context));
    assert_eq!(effective.plan.intent, Intent::Count, "explicit intent overrides");
    assert_eq!(effective.plan.filters.len(), 1);
    assert_eq!(effective.plan.target_field.as_deref(), Some("script name"));
}

#[test]
fn distinct_can_be_switched_off_by_a_follow_up() {
    let plan = QueryPlan::new(Intent::Count)
        .with_filter("form name", Operator::Equals, "Demographics")
        .with_target("script name")
        .with_distinct(true);
    let context = prior(plan, &["A", "B"]);

    let inherited = merge(QueryPlan::new(Intent::Count), Some(&context));
    assert_eq!(inherited.plan.distinct, Some(true), "not stated, so inherited");
    let switched_off = merge(QueryPlan::new(Intent::Count).with_distinct(false), Some(&context));
    assert_eq!(switched_off.plan.distinct, Some(false), "stated, so it wins");
    assert!(!switched_off.plan.is_distinct());
}

#[test]
fn current_turn_wins_on_the_same_field() {
    let context = demographics_scripts();
    let current = QueryPlan::new(Intent::FollowUp).with_filter("Form Name", Operator::Equals, "Diagnosis");
    let effective = merge(current, Some(&context));
    assert_eq!(effective.plan.filters, vec![Filter::new("Form Name", Operator::Equals, "Diagnosis")]);
}

#[test]
fn resolved_merge_treats_synonyms_as_one_field() {
    let aliases = common::aliases(&common::dataset());
    let context = demographics_scripts();
    let current = QueryPlan::new(Intent::FollowUp).with_filter("form", Operator::Equals, "Diagnosis");

    let by_term = merge(current.clone(), Some(&context));
    assert_eq!(by_term.plan.filters.len(), 2, "terms differ, so both are kept");

    let by_column = merge_resolved(current, Some(&context), &aliases);
    assert_eq!(by_column.plan.filters, vec![Filter::new("form", Operator::Equals, "Diagnosis")]);
}

#[test]
fn explicit_target_and_limit_override() {
    let context = demographics_scripts();
    let current = QueryPlan::new(Intent::FollowUp).with_target("service").with_limit(1);
    let effective = merge(current, Some(&context));
    assert_eq!(effective.plan.target_field.as_deref(), Some("service"));
    assert_eq!(effective.plan.limit, Some(1));
}

#[test]
fn follow_up_without_context_is_flagged() {
    let current = QueryPlan::new(Intent::FollowUp).with_filter("service", Operator::Equals, "Billing");
    let effective = merge(current.clone(), None);
    assert!(effective.no_context);
    assert!(!effective.inherited);
    assert_eq!(effective.plan, current);
}

#[test]
fn first_unfiltered_question_is_not_a_follow_up() {
    let effective = merge(QueryPlan::new(Intent::UniqueList).with_target("form"), None);
    assert!(!effective.no_context);
    assert!(!effective.inherited);
}

#[test]
fn filtered_questions_and_small_talk_ignore_context() {
    let context = demographics_scripts();
    let fresh = QueryPlan::new(Intent::Count).with_filter("service", Operator::Contains, "bill");
    assert_eq!(merge(fresh.clone(), Some(&context)).plan, fresh);
    let chat = QueryPlan::new(Intent::SmallTalk);
    let effective = merge(chat.clone(), Some(&context));
    assert_eq!(effective.plan, chat);
    assert!(!effective.inherited);
}

#[test]
fn hint_prefers_a_single_answer() {
    let plan = QueryPlan::new(Intent::Lookup)
        .with_filter("field name", Operator::Equals, "DOB")
        .with_target("script name");
    let single = prior(plan.clone(), &["B"]);
    assert_eq!(single.hint(), Some(ContextHint { field: "script name".into(), value: "B".into() }));
    let several = prior(plan, &["A", "B"]);
    assert_eq!(several.hint(), Some(ContextHint { field: "field name".into(), value: "DOB".into() }));
}

#[test]
fn sessions_are_isolated_and_can_end() {
    let store = ContextStore::new();
    {
        let slot = store.session("alice").unwrap();
        *slot.lock().unwrap() = Some(demographics_scripts());
    }
    store.session("bob").unwrap();
    assert_eq!(store.len().unwrap(), 2);
    assert!(store.snapshot("alice").unwrap().is_some());
    assert!(store.snapshot("bob").unwrap().is_none());
    assert!(store.snapshot("carol").unwrap().is_none());

    assert!(store.end("alice").unwrap());
    assert!(!store.end("alice").unwrap());
    assert!(store.snapshot("alice").unwrap().is_none());
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn empty_idle_sessions_can_be_released() {
    let store = ContextStore::new();
    let slot = store.session("busy").unwrap();
    assert!(!store.release_if_empty("busy").unwrap(), "a turn still holds the slot");
    drop(slot);
    assert!(store.release_if_empty("busy").unwrap());
    assert_eq!(store.len().unwrap(), 0);

    *store.session("kept").unwrap().lock().unwrap() = Some(demographics_scripts());
    assert!(!store.release_if_empty("kept").unwrap(), "sessions with context stay");
    assert!(!store.release_if_empty("nobody").unwrap());
    assert_eq!(store.len().unwrap(), 1);
}
