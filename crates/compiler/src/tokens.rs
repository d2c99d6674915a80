use compact_str::CompactString;
use core::fmt;
use std::ops::Range;
use std::sync::Arc;

/// A literal value resolved by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    Double(f64),
    String(CompactString),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Decimal(d) => {
                if d.fract() == 0.0 {
                    write!(f, "{d:.1}")
                } else {
                    write!(f, "{d}")
                }
            }
            Literal::Double(d) => write!(f, "{d:e}"),
            Literal::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Lexeme(CompactString),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: TokenValue,
    /// Byte range in the source text.
    pub span: Range<usize>,
}

impl Token {
    pub fn lexeme(lexeme: &str, span: Range<usize>) -> Self {
        Self { value: TokenValue::Lexeme(CompactString::from(lexeme)), span }
    }

    pub fn literal(literal: Literal, span: Range<usize>) -> Self {
        Self { value: TokenValue::Literal(literal), span }
    }

    pub fn as_lexeme(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Lexeme(s) => Some(s.as_str()),
            TokenValue::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.value {
            TokenValue::Literal(l) => Some(l),
            TokenValue::Lexeme(_) => None,
        }
    }

    /// True when this token is the lexeme `s`. Literals never match.
    pub fn is(&self, s: &str) -> bool {
        self.as_lexeme() == Some(s)
    }

    pub fn first_char(&self) -> Option<char> {
        self.as_lexeme().and_then(|s| s.chars().next())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Lexeme(s) => f.write_str(s),
            TokenValue::Literal(l) => l.fmt(f),
        }
    }
}

/// The immutable token sequence of one source expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenQueue {
    source: Arc<str>,
    tokens: Vec<Token>,
}

impl TokenQueue {
    pub fn new(source: impl Into<Arc<str>>, tokens: Vec<Token>) -> Self {
        Self { source: source.into(), tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Byte offset of the token at `index`, or the end of the source for the end position.
    pub fn offset_of(&self, index: usize) -> Option<usize> {
        match self.tokens.get(index) {
            Some(t) => Some(t.span.start),
            None if index == self.tokens.len() => Some(self.source.len()),
            None => None,
        }
    }

    /// Source text covered by a range of token indices.
    ///
    /// Queues assembled by an external lexer may carry spans that do not
    /// address `source`; their text is rebuilt from the tokens instead.
    pub fn text(&self, range: Range<usize>) -> String {
        let Some(tokens) = self.tokens.get(range) else { return String::new() };
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return String::new();
        };
        if let Some(slice) = self.source.get(first.span.start..last.span.end) {
            return slice.to_string();
        }
        tokens.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    }
}

/// Saved cursor state for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorMark {
    pos: usize,
    first_char: Option<char>,
}

/// Forward-only reader over a window of a [`TokenQueue`].
///
/// The cursor stops at `end`; reading past it yields `None`.
#[derive(Debug, Clone)]
pub(crate) struct TokenCursor<'q> {
    queue: &'q TokenQueue,
    end: usize,
    pos: usize,
    token: Option<&'q Token>,
    first_char: Option<char>,
}

impl<'q> TokenCursor<'q> {
    pub(crate) fn new(queue: &'q TokenQueue, window: Range<usize>) -> Self {
        let end = window.end.min(queue.len());
        let pos = window.start.min(end);
        let mut cursor = Self { queue, end, pos, token: None, first_char: None };
        cursor.sync();
        cursor
    }

    fn sync(&mut self) {
        self.token = if self.pos < self.end { self.queue.get(self.pos) } else { None };
        self.first_char = self.token.and_then(Token::first_char);
    }

    pub(crate) fn queue(&self) -> &'q TokenQueue {
        self.queue
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn end(&self) -> usize {
        self.end
    }

    pub(crate) fn at_end(&self) -> bool {
        self.token.is_none()
    }

    pub(crate) fn current(&self) -> Option<&'q Token> {
        self.token
    }

    pub(crate) fn current_char(&self) -> Option<char> {
        self.first_char
    }

    /// Token `n` places ahead of the cursor; `peek(0)` is the current token.
    pub(crate) fn peek(&self, n: usize) -> Option<&'q Token> {
        let index = self.pos.checked_add(n)?;
        if index < self.end { self.queue.get(index) } else { None }
    }

    pub(crate) fn advance(&mut self) -> Option<&'q Token> {
        let consumed = self.token?;
        self.pos += 1;
        self.sync();
        Some(consumed)
    }

    pub(crate) fn mark(&self) -> CursorMark {
        CursorMark { pos: self.pos, first_char: self.first_char }
    }

    pub(crate) fn reset(&mut self, mark: CursorMark) {
        self.pos = mark.pos;
        self.sync();
        debug_assert_eq!(self.first_char, mark.first_char);
    }

    /// Jump forward to `pos`, used once a deferred range has been scanned.
    pub(crate) fn skip_to(&mut self, pos: usize) {
        debug_assert!(pos >= self.pos);
        self.pos = pos.min(self.end);
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> TokenQueue {
        TokenQueue::new(
            "a + 1",
            vec![
                Token::lexeme("a", 0..1),
                Token::lexeme("+", 2..3),
                Token::literal(Literal::Integer(1), 4..5),
            ],
        )
    }

    #[test]
    fn cursor_stops_at_end() {
        let q = queue();
        let mut c = TokenCursor::new(&q, 0..q.len());
        assert_eq!(c.current_char(), Some('a'));
        assert!(c.advance().is_some());
        assert!(c.advance().is_some());
        assert!(c.advance().is_some());
        assert!(c.at_end());
        assert!(c.advance().is_none());
        assert_eq!(c.pos(), 3);
    }

    #[test]
    fn mark_and_reset_restore_cached_state() {
        let q = queue();
        let mut c = TokenCursor::new(&q, 0..q.len());
        let m = c.mark();
        c.advance();
        assert_eq!(c.current_char(), Some('+'));
        c.reset(m);
        assert_eq!(c.current_char(), Some('a'));
    }

    #[test]
    fn text_slices_source() {
        let q = queue();
        assert_eq!(q.text(1..3), "+ 1");
        assert_eq!(q.text(2..2), "");
    }

    #[test]
    fn window_limits_peek() {
        let q = queue();
        let c = TokenCursor::new(&q, 0..2);
        assert!(c.peek(1).is_some());
        assert!(c.peek(2).is_none());
    }
}
