use scriptlink::dataset::Value;
use scriptlink::executor::{ResultSet, Tag};
use scriptlink::format::{DisplayKind, Formatter, NO_MATCHES};
use scriptlink::settings::DisplaySettings;
use scriptlink::smalltalk::SmallTalk;

fn list(tag: Tag, columns: &[&str], rows: &[&[&str]]) -> ResultSet {
    let rows: Vec<Vec<Value>> = rows.iter().map(|r| r.iter().map(|&v| Value::from(v)).collect()).collect();
    ResultSet {
        tag,
        columns: columns.iter().map(|c| c.to_string()).collect(),
        total: rows.len(),
        matched: rows.len(),
        rows,
        limited: false,
        target_values: Vec::new(),
    }
}

#[test]
fn counts_are_plain_numbers() {
    let mut result = list(Tag::Count, &[], &[]);
    result.total = 2;
    let reply = Formatter::default().render(&result);
    assert_eq!(reply.text, "2");
    assert_eq!(reply.display_kind, DisplayKind::PlainText);
}

#[test]
fn empty_lists_say_so() {
    let reply = Formatter::default().render(&list(Tag::List, &["ScriptName"], &[]));
    assert_eq!(reply.text, NO_MATCHES);
    assert_eq!(reply.display_kind, DisplayKind::PlainText);
}

#[test]
fn one_value_is_plain_text() {
    let reply = Formatter::default().render(&list(Tag::List, &["ScriptName"], &[&["A"]]));
    assert_eq!(reply.text, "A");
    assert_eq!(reply.display_kind, DisplayKind::PlainText);
    let reply = Formatter::default().render(&list(Tag::Single, &["Form Name", "ScriptName"], &[&["Demographics", "A"]]));
    assert_eq!(reply.text, "Demographics, A");
    assert_eq!(reply.display_kind, DisplayKind::PlainText);
}

#[test]
fn several_rows_render_as_a_table() {
    let reply = Formatter::default().render(&list(Tag::List, &["ScriptName"], &[&["A"], &["B"]]));
    assert_eq!(reply.display_kind, DisplayKind::Table);
    assert_eq!(
        reply.text,
        "<table class=\"results-table\"><thead><tr><th>ScriptName</th></tr></thead>\
         <tbody><tr><td>A</td></tr><tr><td>B</td></tr></tbody></table>"
    );
}

#[test]
fn several_columns_render_as_a_table() {
    let reply = Formatter::default().render(&list(Tag::List, &["Form Name", "ScriptName"], &[&["Diagnosis", "C"]]));
    assert_eq!(reply.display_kind, DisplayKind::Table);
    assert_eq!(reply.text.matches("<th>").count(), 2);
    assert_eq!(reply.text.matches("<thead>").count(), 1, "exactly one header row");
}

#[test]
fn rows_beyond_the_cap_are_summarized() {
    let rows: [&[&str]; 5] = [&["a"], &["b"], &["c"], &["d"], &["e"]];
    let table = Formatter::new(DisplaySettings { max_display_rows: 2, plain_text_max_rows: 1 });
    let reply = table.render(&list(Tag::List, &["ScriptName"], &rows));
    assert_eq!(reply.text.matches("<td").count(), 3, "two rows plus the footer");
    assert!(reply.text.contains("+3 more"));

    let plain = Formatter::new(DisplaySettings { max_display_rows: 2, plain_text_max_rows: 10 });
    let reply = plain.render(&list(Tag::List, &["ScriptName"], &rows));
    assert_eq!(reply.display_kind, DisplayKind::PlainText);
    assert_eq!(reply.text, "a\nb\n+3 more");
}

#[test]
fn markup_in_cells_is_escaped() {
    let reply = Formatter::default().render(&list(Tag::List, &["A<B"], &[&["<b>x</b>"], &["Tom & Jerry"]]));
    assert!(reply.text.contains("<th>A&lt;B</th>"));
    assert!(reply.text.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(reply.text.contains("Tom &amp; Jerry"));
}

#[test]
fn clarifications_are_plain_text() {
    let formatter = Formatter::default();
    let reply = formatter.unknown_field("owner", &["form name".to_string(), "script name".to_string()]);
    assert!(reply.text.contains("\"owner\""));
    assert!(reply.text.contains("form name, script name"));
    assert_eq!(formatter.unanswerable(Some("no dates")).text, "I cannot answer that. Reason: no dates");
    assert_eq!(formatter.unanswerable(None).text, "I cannot answer that.");
    assert_eq!(formatter.small_talk(SmallTalk::Thanks).text, "You're welcome! Happy to help.");
    for reply in [formatter.clarify(), formatter.no_context()] {
        assert_eq!(reply.display_kind, DisplayKind::PlainText);
        assert!(reply.text.ends_with('?'));
    }
}
