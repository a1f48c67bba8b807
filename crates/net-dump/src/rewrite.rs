//! Literal substring rewriting of buffered bodies.
//!
//! Bodies are decoded as UTF-8 (lossily) before the rules run, so payloads that
//! are not valid UTF-8 can be altered by a non-empty rule list.

use crate::config::ReplaceRule;
use bytes::Bytes;

/// Apply `rules` in order; each rule sees the output of the previous one.
pub fn rewrite(body: Bytes, rules: &[ReplaceRule]) -> Bytes {
    if rules.is_empty() {
        return body;
    }

    let text = String::from_utf8_lossy(&body);
    let rewritten = rules
        .iter()
        .fold(text.into_owned(), |acc, rule| acc.replace(&rule.from, &rule.to));
    Bytes::from(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules(pairs: &[(&str, &str)]) -> Vec<ReplaceRule> {
        pairs.iter().map(|(f, t)| ReplaceRule::new(*f, *t)).collect()
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let out = rewrite(
            Bytes::from_static(b"old value old"),
            &rules(&[("old", "new")]),
        );
        assert_eq!(out, Bytes::from_static(b"new value new"));
    }

    #[test]
    fn test_rules_apply_in_order() {
        let out = rewrite(Bytes::from_static(b"a"), &rules(&[("a", "b"), ("b", "c")]));
        assert_eq!(out, Bytes::from_static(b"c"));

        let out = rewrite(Bytes::from_static(b"a"), &rules(&[("b", "c"), ("a", "b")]));
        assert_eq!(out, Bytes::from_static(b"b"));
    }

    #[test]
    fn test_patterns_are_literal() {
        let out = rewrite(
            Bytes::from_static(b"a.c abc"),
            &rules(&[(".", "!"), ("$", "x")]),
        );
        assert_eq!(out, Bytes::from_static(b"a!c abc"));
    }

    #[test]
    fn test_empty_rules_keep_binary_bodies() {
        let body = Bytes::from_static(&[0xff, 0xfe, 0x00, 0x80]);
        assert_eq!(rewrite(body.clone(), &[]), body);
    }

    #[test]
    fn test_multibyte_text_survives() {
        let out = rewrite(
            Bytes::from("grüße, 世界"),
            &rules(&[("世界", "world")]),
        );
        assert_eq!(out, Bytes::from("grüße, world"));
    }

    proptest! {
        #[test]
        fn prop_empty_rules_are_identity(body in proptest::collection::vec(any::<u8>(), 0..256)) {
            let body = Bytes::from(body);
            prop_assert_eq!(rewrite(body.clone(), &[]), body);
        }

        #[test]
        fn prop_sequential_rules_fold_left(
            text in "[abc ]{0,40}",
            pairs in proptest::collection::vec(("[abc]{1,2}", "[abc]{0,2}"), 0..4),
        ) {
            let rule_list: Vec<ReplaceRule> =
                pairs.iter().map(|(f, t)| ReplaceRule::new(f.clone(), t.clone())).collect();
            let expected = pairs
                .iter()
                .fold(text.clone(), |acc, (f, t)| acc.replace(f.as_str(), t.as_str()));
            prop_assert_eq!(rewrite(Bytes::from(text), &rule_list), Bytes::from(expected));
        }
    }
}
