#![allow(dead_code)]

use std::sync::Arc;

use scriptlink::alias::{default_concepts, AliasResolver};
use scriptlink::dataset::{Dataset, Value};
use scriptlink::engine::Engine;
use scriptlink::format::Formatter;

fn text(s: &str) -> Value {
    Value::from(s)
}

/// Six scripts across five forms. Headers deliberately use mixed spellings.
pub fn dataset() -> Dataset {
    let columns = ["Form Name", "ScriptName", "Field Name", "Service", "Namespace"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows = vec![
        vec![text("Demographics"), text("A"), text("PatientName"), text("Registration"), text("CWS")],
        vec![text("Demographics"), text("B"), text("DOB"), text("Registration"), text("CWS")],
        vec![text("Diagnosis"), text("C"), text("Code"), text("Clinical"), text("CWS")],
        vec![text("PhD PsyD SW MFT Progress Note"), text("D"), text("Note"), text("Clinical"), text("PM")],
        vec![text("Special Use Progress Note"), text("A"), text("Note"), text("Billing"), text("PM")],
        vec![text("Billing Claims"), text("E"), Value::Empty, text("Billing"), Value::from(7.0)],
    ];
    Dataset::new(columns, rows).expect("fixture is rectangular")
}

pub fn aliases(dataset: &Dataset) -> AliasResolver {
    AliasResolver::discover(dataset.columns(), &default_concepts())
}

pub fn engine() -> Engine {
    let dataset = dataset();
    let aliases = aliases(&dataset);
    Engine::new(Arc::new(dataset), aliases, Formatter::default())
}
