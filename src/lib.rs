//! Scriptlink – answers natural-language questions about a spreadsheet of EHR
//! script metadata.
//!
//! A language model (outside this crate) reads the user's question and emits a
//! small JSON *query plan*. Everything after that is deterministic and lives
//! here:
//! * [`plan`] – the [`plan::QueryPlan`] schema and a strict parser that turns
//!   untrusted model output into a plan or one of a few [`error::ParseError`]s.
//! * [`context`] – per-session memory of the last answer, used to complete
//!   elliptical follow-ups ("how many?") by overlaying them on the prior plan.
//! * [`alias`] – conceptual field names ("form name", "Script") resolved to the
//!   dataset's real column headers.
//! * [`executor`] – runs a plan against the in-memory [`dataset::Dataset`].
//! * [`format`] – renders results as plain text or an HTML table.
//! * [`engine`] – ties the above into one conversational turn.
//!
//! ## Plans
//! ```json
//! {"intent": "filter_list",
//!  "filters": [{"field": "form name", "operator": "equals", "value": "Demographics"}],
//!  "target_field": "script name"}
//! ```
//! Intents are `lookup`, `filter_list`, `count`, `unique_list`, `small_talk`,
//! `follow_up` and `unknown`; operators are `equals`, `contains` and
//! `not_equals`, all case-insensitive.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use scriptlink::{alias::{AliasResolver, default_concepts}, dataset::{Dataset, Value},
//!     engine::Engine, format::Formatter};
//! let dataset = Dataset::new(
//!     vec!["Form Name".into(), "Script Name".into()],
//!     vec![vec![Value::from("Demographics"), Value::from("A")],
//!          vec![Value::from("Demographics"), Value::from("B")]],
//! ).unwrap();
//! let aliases = AliasResolver::discover(dataset.columns(), &default_concepts());
//! let engine = Engine::new(Arc::new(dataset), aliases, Formatter::default());
//! let turn = engine.respond("s1", "What scripts are on Demographics?", Some(r#"{"intent": "count",
//!     "filters": [{"field": "form", "operator": "equals", "value": "demographics"}]}"#)).unwrap();
//! assert_eq!(turn.reply.text, "2");
//! ```
//!
//! The binary (`src/main.rs`) loads settings and a JSON dataset and serves the
//! engine over HTTP (see [`server`]).

pub mod alias;
pub mod context;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod executor;
pub mod format;
pub mod plan;
pub mod server;
pub mod settings;
pub mod smalltalk;
