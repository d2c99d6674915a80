use owo_colors::{OwoColorize, Stream};
use std::error::Error;

pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Parse `--namespace PREFIX=URI` values.
pub fn parse_namespace_bindings(values: &[String]) -> CliResult<Vec<(String, String)>> {
    values
        .iter()
        .map(|value| {
            let (prefix, uri) =
                value.split_once('=').ok_or_else(|| format!("expected PREFIX=URI, got '{value}'"))?;
            if prefix.is_empty() || uri.is_empty() {
                return Err(format!("expected PREFIX=URI, got '{value}'").into());
            }
            Ok((prefix.to_owned(), uri.to_owned()))
        })
        .collect()
}

pub fn colorize_heading(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bold().fg_rgb::<79, 166, 255>().to_string()).to_string()
}

pub fn colorize_literal(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.fg_rgb::<136, 192, 74>().to_string()).to_string()
}

pub fn colorize_dimmed(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.dimmed().to_string()).to_string()
}

#[cfg(test)]
pub(crate) fn strip_ansi(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }
    result
}
