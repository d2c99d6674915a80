use opxpath::{compile, is_balanced};
use proptest::prelude::*;

const CORPUS: &[&str] = &[
    "a/b[@c = 1]",
    "for $x in (1, 2) return $x * 2",
    "map { 'a': [1, 2] }",
    "if ($p) then count(//x) else -1",
    "some $v in $s satisfies $v eq 'z'",
    "$f(1, 2) => string-join('-')",
];

fn balanced() -> impl Strategy<Value = String> {
    let leaf = "[a-z0-9 ,]{0,4}";
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| format!("({s})")),
            inner.clone().prop_map(|s| format!("[{s}]")),
            inner.clone().prop_map(|s| format!("{{{s}}}")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("{a}{b}")),
        ]
    })
}

// Removing a single bracket leaves an odd number of brackets.
proptest! {
    #[test]
    fn prop_removing_a_bracket_unbalances(text in balanced(), pick in any::<prop::sample::Index>()) {
        prop_assert!(is_balanced(&text));
        let brackets: Vec<usize> = text
            .char_indices()
            .filter(|(_, c)| "()[]{}".contains(*c))
            .map(|(i, _)| i)
            .collect();
        if !brackets.is_empty() {
            let at = brackets[pick.index(brackets.len())];
            let mut damaged = text.clone();
            damaged.remove(at);
            prop_assert!(!is_balanced(&damaged), "{damaged}");
        }
    }
}

// Every prefix of a valid expression either compiles to a well-formed map
// or fails with a recoverable syntax error.
proptest! {
    #[test]
    fn prop_prefixes_fail_cleanly(which in 0..CORPUS.len(), cut in 0usize..64) {
        let src = CORPUS[which];
        let prefix = &src[..cut.min(src.len())];
        match compile(prefix) {
            Ok(c) => prop_assert_eq!(c.verify(), Ok(())),
            Err(e) => prop_assert!(e.is_recoverable(), "{prefix:?}: {e}"),
        }
    }
}

// Additive chains associate to the left.
proptest! {
    #[test]
    fn prop_additive_chains(first in 0u32..1000, rest in prop::collection::vec((any::<bool>(), 0u32..1000), 0..8)) {
        let mut src = first.to_string();
        let mut expected = "Literal".to_string();
        for (plus, n) in &rest {
            let (op, name) = if *plus { ("+", "Plus") } else { ("-", "Minus") };
            src.push_str(&format!(" {op} {n}"));
            expected = format!("{name}({expected} Literal)");
        }
        let c = compile(&src).unwrap();
        prop_assert_eq!(c.op_map().outline(), format!("XPath({expected})"));
        prop_assert_eq!(c.verify(), Ok(()));
    }
}
