//! Redacting field formatter for `tracing-subscriber`

use std::fmt;

use tracing::field::{Field, Visit};
use tracing_subscriber::field::{MakeVisitor, VisitFmt, VisitOutput};
use tracing_subscriber::fmt::format::Writer;

use super::scrub::{scrub_scalar, scrub_value};

const MESSAGE_FIELD: &str = "message";

/// Formats event and span fields, scrubbing protected values on the way out
///
/// Plug into a `fmt` subscriber with `.fmt_fields(RedactingFields::new())`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactingFields;

impl RedactingFields {
    pub fn new() -> Self {
        Self
    }
}

impl<'a> MakeVisitor<Writer<'a>> for RedactingFields {
    type Visitor = RedactingVisitor<'a>;

    fn make_visitor(&self, target: Writer<'a>) -> Self::Visitor {
        RedactingVisitor::new(target)
    }
}

/// Writes `name=value` pairs, separated by spaces
pub struct RedactingVisitor<'a> {
    writer: Writer<'a>,
    is_empty: bool,
    result: fmt::Result,
}

impl<'a> RedactingVisitor<'a> {
    fn new(writer: Writer<'a>) -> Self {
        Self {
            writer,
            is_empty: true,
            result: Ok(()),
        }
    }

    fn write_field(&mut self, field: &Field, value: &dyn fmt::Display) {
        if self.result.is_err() {
            return;
        }
        let pad = if self.is_empty { "" } else { " " };
        self.result = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{}{}", pad, value)
        } else {
            write!(self.writer, "{}{}={}", pad, field.name(), value)
        };
        self.is_empty = false;
    }

    fn record_text(&mut self, field: &Field, text: &str) {
        let scrubbed = scrub_value(field.name(), text);
        self.write_field(field, &scrubbed);
    }

    fn record_scalar(&mut self, field: &Field, value: &dyn fmt::Display) {
        match scrub_scalar(field.name()) {
            Some(placeholder) => self.write_field(field, &placeholder),
            None => self.write_field(field, value),
        }
    }
}

/// `?value` on a string renders with surrounding quotes
fn strip_debug_quotes(rendered: &str) -> &str {
    rendered
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(rendered)
}

impl Visit for RedactingVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == MESSAGE_FIELD {
            self.write_field(field, &rendered);
        } else {
            self.record_text(field, strip_debug_quotes(&rendered));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_text(field, &value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_scalar(field, &value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_scalar(field, &value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_scalar(field, &value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_scalar(field, &value);
    }
}

impl VisitOutput<fmt::Result> for RedactingVisitor<'_> {
    fn finish(self) -> fmt::Result {
        self.result
    }
}

impl VisitFmt for RedactingVisitor<'_> {
    fn writer(&mut self) -> &mut dyn fmt::Write {
        &mut self.writer
    }
}
