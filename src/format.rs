//! Turns results, small talk and recoverable failures into the bot's reply.
//!
//! A reply is a `(text, display_kind)` pair. `Table` replies carry HTML with a
//! single header row naming the projected columns; everything else is plain
//! text.

use std::fmt::Write;

use serde::Serialize;

use crate::dataset::Row;
use crate::executor::{ResultSet, Tag};
use crate::settings::DisplaySettings;
use crate::smalltalk::{self, SmallTalk};

pub const NO_MATCHES: &str = "No matching records.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    PlainText,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub display_kind: DisplayKind,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), display_kind: DisplayKind::PlainText }
    }
    pub fn table(html: String) -> Self {
        Self { text: html, display_kind: DisplayKind::Table }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    display: DisplaySettings,
}

impl Formatter {
    pub fn new(display: DisplaySettings) -> Self {
        Self { display }
    }

    pub fn render(&self, result: &ResultSet) -> Reply {
        if result.tag == Tag::Count {
            return Reply::text(result.total.to_string());
        }
        if result.rows.is_empty() {
            return Reply::text(NO_MATCHES);
        }
        let tabular = result.columns.len() > 1 || result.rows.len() > self.display.plain_text_max_rows;
        if result.tag == Tag::Single || !tabular {
            return self.render_plain(&result.rows);
        }
        self.render_table(&result.columns, &result.rows)
    }

    fn render_plain(&self, rows: &[Row]) -> Reply {
        let shown = rows.len().min(self.display.max_display_rows);
        let mut lines: Vec<String> = rows[..shown]
            .iter()
            .map(|row| row.iter().map(|v| v.normalized()).collect::<Vec<_>>().join(", "))
            .collect();
        if rows.len() > shown {
            lines.push(format!("+{} more", rows.len() - shown));
        }
        Reply::text(lines.join("\n"))
    }

    fn render_table(&self, columns: &[String], rows: &[Row]) -> Reply {
        let shown = rows.len().min(self.display.max_display_rows);
        let mut html = String::from("<table class=\"results-table\"><thead><tr>");
        for column in columns {
            let _ = write!(html, "<th>{}</th>", escape(column));
        }
        html.push_str("</tr></thead><tbody>");
        for row in &rows[..shown] {
            html.push_str("<tr>");
            for value in row {
                let _ = write!(html, "<td>{}</td>", escape(&value.normalized()));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody>");
        if rows.len() > shown {
            let _ = write!(
                html,
                "<tfoot><tr><td colspan=\"{}\">+{} more</td></tr></tfoot>",
                columns.len(),
                rows.len() - shown
            );
        }
        html.push_str("</table>");
        Reply::table(html)
    }

    pub fn small_talk(&self, kind: SmallTalk) -> Reply {
        Reply::text(smalltalk::reply(kind))
    }

    /// The plan could not be parsed, or no plan was produced at all.
    pub fn clarify(&self) -> Reply {
        Reply::text("Sorry, I couldn't work out a query from that. Could you rephrase your question?")
    }

    pub fn unknown_field(&self, field: &str, known: &[String]) -> Reply {
        if known.is_empty() {
            return Reply::text(format!("I don't understand which field \"{field}\" refers to."));
        }
        Reply::text(format!(
            "I don't understand which field \"{field}\" refers to. I know about: {}.",
            known.join(", ")
        ))
    }

    pub fn no_context(&self) -> Reply {
        Reply::text("I'm not sure what that refers to. Could you restate your full question?")
    }

    pub fn unanswerable(&self, reason: Option<&str>) -> Reply {
        match reason {
            Some(reason) => Reply::text(format!("I cannot answer that. Reason: {reason}")),
            None => Reply::text("I cannot answer that."),
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
