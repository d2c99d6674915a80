use compact_str::CompactString;
use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;

use crate::error::CompileError;
use crate::tokens::{Literal, Token, TokenQueue};

#[derive(pest_derive::Parser)]
#[grammar = "xpath31_tokens.pest"]
struct TokenGrammar;

/// Split XPath source text into a [`TokenQueue`].
///
/// Literals are resolved here so the compiler never re-reads numbers or
/// strings from their printed form.
pub fn tokenize(input: &str) -> Result<TokenQueue, CompileError> {
    let mut pairs = TokenGrammar::parse(Rule::tokens, input).map_err(|e| {
        let offset = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((s, _)) => s,
        };
        let found = input.get(offset..).and_then(|rest| rest.chars().next());
        CompileError::Lexical {
            offset,
            message: match found {
                Some(c) => format!("unrecognized character '{c}'"),
                None => "unexpected end of input".to_string(),
            },
        }
    })?;

    let mut tokens = Vec::new();
    let Some(root) = pairs.next() else {
        return Ok(TokenQueue::new(input, tokens));
    };
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::EOI {
            break;
        }
        tokens.push(to_token(pair)?);
    }
    tracing::trace!(count = tokens.len(), "tokenized expression");
    Ok(TokenQueue::new(input, tokens))
}

fn to_token(pair: Pair<'_, Rule>) -> Result<Token, CompileError> {
    let span = pair.as_span();
    let range = span.start()..span.end();
    let text = pair.as_str();
    let token = match pair.as_rule() {
        Rule::string_literal => {
            let unescaped = match pair.into_inner().next() {
                Some(inner) if inner.as_rule() == Rule::dbl_inner => inner.as_str().replace("\"\"", "\""),
                Some(inner) => inner.as_str().replace("''", "'"),
                None => String::new(),
            };
            Token::literal(Literal::String(CompactString::from(unescaped)), range)
        }
        Rule::integer_literal => {
            let value = text.parse::<i64>().map_err(|_| CompileError::Lexical {
                offset: range.start,
                message: format!("integer literal {text} is out of range"),
            })?;
            Token::literal(Literal::Integer(value), range)
        }
        Rule::decimal_literal => Token::literal(Literal::Decimal(parse_float(text, range.start)?), range),
        Rule::double_literal => Token::literal(Literal::Double(parse_float(text, range.start)?), range),
        _ => Token::lexeme(text, range),
    };
    Ok(token)
}

fn parse_float(text: &str, offset: usize) -> Result<f64, CompileError> {
    text.parse::<f64>()
        .map_err(|_| CompileError::Lexical { offset, message: format!("malformed numeric literal {text}") })
}
