//! Bracket balance checks for deferred text.

use crate::tokens::Token;

fn closer_for(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

fn is_closer(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// True if every `(`, `[` and `{` in `text` is closed by its matching
/// bracket in nesting order.
///
/// Every character counts, including those inside string literals, so a
/// balanced text stays balanced only under balanced edits.
pub fn is_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    for c in text.chars() {
        if let Some(close) = closer_for(c) {
            stack.push(close);
        } else if is_closer(c) && stack.pop() != Some(c) {
            return false;
        }
    }
    stack.is_empty()
}

/// Token-level balance check. Literal tokens never count as brackets.
pub(crate) fn tokens_balanced(tokens: &[Token]) -> bool {
    let mut stack = Vec::new();
    for c in tokens.iter().filter_map(bracket_char) {
        if let Some(close) = closer_for(c) {
            stack.push(close);
        } else if stack.pop() != Some(c) {
            return false;
        }
    }
    stack.is_empty()
}

/// The bracket a token stands for, if it is one.
pub(crate) fn bracket_char(token: &Token) -> Option<char> {
    let s = token.as_lexeme()?;
    let mut chars = s.chars();
    let c = chars.next()?;
    (chars.next().is_none() && (closer_for(c).is_some() || is_closer(c))).then_some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", true)]
    #[case("(1, [2], map{3: 4})", true)]
    #[case("(]", false)]
    #[case("((1)", false)]
    #[case(")(", false)]
    #[case("f(')')", false)]
    fn checks_nesting(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_balanced(text), expected);
    }
}
