use crate::OutputFormat;
use crate::util::{CliResult, colorize_dimmed, colorize_literal};
use clap::Args;
use opxpath::{Literal, Token, tokenize};
use serde::Serialize;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct TokensArgs {
    #[arg(value_name = "XPATH")]
    pub expression: String,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct TokenSummary {
    index: usize,
    kind: &'static str,
    text: String,
    start: usize,
    end: usize,
}

impl TokenSummary {
    fn from_token(index: usize, token: &Token) -> Self {
        let kind = match token.as_literal() {
            None => "lexeme",
            Some(Literal::Integer(_)) => "integer",
            Some(Literal::Decimal(_)) => "decimal",
            Some(Literal::Double(_)) => "double",
            Some(Literal::String(_)) => "string",
        };
        Self { index, kind, text: token.to_string(), start: token.span.start, end: token.span.end }
    }
}

pub fn run(args: &TokensArgs) -> CliResult<String> {
    let queue = tokenize(&args.expression)?;
    let summaries: Vec<TokenSummary> =
        queue.tokens().iter().enumerate().map(|(i, t)| TokenSummary::from_token(i, t)).collect();
    let output = match args.format {
        OutputFormat::Text => render_tokens_text(&summaries),
        OutputFormat::Json => serde_json::to_string_pretty(&summaries)?,
    };
    Ok(output)
}

pub(crate) fn render_tokens_text(tokens: &[TokenSummary]) -> String {
    let mut output = String::new();
    for token in tokens {
        let span = colorize_dimmed(&format!("{}..{}", token.start, token.end));
        let text = if token.kind == "lexeme" { token.text.clone() } else { colorize_literal(&token.text) };
        let _ = writeln!(&mut output, "{:>4}  {span:<10}  {text}", token.index);
    }
    output.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::strip_ansi;
    use rstest::rstest;

    fn args(expression: &str, format: OutputFormat) -> TokensArgs {
        TokensArgs { expression: expression.into(), format }
    }

    #[rstest]
    fn text_lists_one_token_per_line() {
        let output = run(&args("a + 'b'", OutputFormat::Text)).expect("tokens");
        let plain = strip_ansi(&output);
        let lines: Vec<&str> = plain.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].trim_start().starts_with("0  0..1"));
        assert!(lines[2].ends_with("\"b\""));
    }

    #[rstest]
    fn json_carries_kinds_and_spans() {
        let output = run(&args("count(1.5)", OutputFormat::Json)).expect("tokens");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(json[0]["kind"], "lexeme");
        assert_eq!(json[0]["text"], "count");
        assert_eq!(json[2]["kind"], "decimal");
        assert_eq!(json[2]["start"], 6);
        assert_eq!(json[2]["end"], 9);
    }

    #[rstest]
    fn lexical_errors_propagate() {
        assert!(run(&args("a ~ b", OutputFormat::Text)).is_err());
    }
}
