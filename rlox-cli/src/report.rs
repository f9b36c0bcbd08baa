use std::io::Write;
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};
use rlox::LoxError;

/// Converts a byte span to a character span for ariadne.
fn byte_to_char_span(source: &str, byte_span: &Range<usize>) -> Range<usize> {
    let start = source[..byte_span.start.min(source.len())].chars().count();
    let end = source[..byte_span.end.min(source.len())].chars().count();
    start..end
}

fn labeled_report<W: Write>(
    header: String,
    message: &str,
    span: &Range<usize>,
    source: &str,
    name: &str,
    writer: &mut W,
) {
    let char_span = byte_to_char_span(source, span);
    Report::build(ReportKind::Error, (name, char_span.clone()))
        .with_message(header)
        .with_label(
            Label::new((name, char_span))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .write((name, Source::from(source)), writer)
        .ok();
}

/// Renders a LoxError as an ariadne report with a labeled source span.
pub fn report_error<W: Write>(
    error: &LoxError,
    source: &str,
    filename: Option<&str>,
    mut writer: W,
) {
    let name = filename.unwrap_or("");

    match error {
        LoxError::Io(_) => {
            writeln!(writer, "{}", error).ok();
        }
        LoxError::Scan { span, message, .. }
        | LoxError::Parse { span, message, .. }
        | LoxError::Resolution { span, message, .. } => {
            labeled_report(error.to_string(), message, span, source, name, &mut writer);
        }
        LoxError::Runtime {
            span,
            message,
            line,
            stack,
        } => {
            labeled_report(
                format!("Runtime error [line {}]", line),
                message,
                span,
                source,
                name,
                &mut writer,
            );
            for frame in stack {
                writeln!(writer, "  in {}", frame).ok();
            }
        }
        // Internal control flow, never reported to users
        LoxError::Break | LoxError::Return(_) | LoxError::ScriptFailed => {}
    }
}
