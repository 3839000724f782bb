//! Name index: baked token sequences to descriptors.
//!
//! Built once per base command from every descriptor's baked name
//! variants, then queried on each dispatch with a longest-prefix scan.
//! Keys are compared by content (ordered, case-insensitive via
//! lowercasing), never by identity.

use crate::descriptor::{BuildError, SubCommandDescriptor};
use crate::message::Token;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lookup structure from baked token sequence to descriptor.
pub struct NameIndex {
    map: HashMap<Vec<String>, Arc<SubCommandDescriptor>>,
    max_len: usize,
}

impl NameIndex {
    /// Indexes every baked name variant of every descriptor.
    ///
    /// The builder already guarantees baked sequences are unique across
    /// the set; a collision reaching this point is a fatal configuration
    /// error, not a silent overwrite.
    pub fn build(descriptors: &[Arc<SubCommandDescriptor>]) -> Result<Self, BuildError> {
        let mut map = HashMap::new();
        let mut max_len = 0;
        for descriptor in descriptors {
            for baked in descriptor.baked_names() {
                if map.insert(baked.clone(), Arc::clone(descriptor)).is_some() {
                    return Err(BuildError::DuplicateName {
                        name: baked.join(" "),
                    });
                }
                max_len = max_len.max(baked.len());
            }
        }
        Ok(Self { map, max_len })
    }

    /// Exact lookup by already-baked token sequence.
    pub fn get(&self, baked: &[String]) -> Option<&Arc<SubCommandDescriptor>> {
        self.map.get(baked)
    }

    /// Longest-prefix match against a token stream.
    ///
    /// Tries the full candidate length first (capped at the longest
    /// registered name) and shrinks token by token; the first hit wins.
    /// Returns the descriptor and the number of tokens it consumed.
    pub fn match_prefix(&self, tokens: &[Token]) -> Option<(&Arc<SubCommandDescriptor>, usize)> {
        let upper = self.max_len.min(tokens.len());
        let mut key: Vec<String> = tokens[..upper]
            .iter()
            .map(|token| token.text().to_lowercase())
            .collect();
        while !key.is_empty() {
            if let Some(descriptor) = self.map.get(&key) {
                return Some((descriptor, key.len()));
            }
            key.pop();
        }
        None
    }

    /// Number of indexed name variants.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no names are indexed.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for NameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameIndex")
            .field("len", &self.map.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgType, ArgValue, Args, ArgumentParser, ParseFailure, ParserRegistry};
    use crate::descriptor::{build_descriptors, SubCommandSpec};
    use crate::handler::{Caller, FnHandler, Outcome};
    use crate::message::Token;
    use crate::permission::Permission;
    use crate::usage::UsageStyle;
    use std::sync::Arc;

    struct EchoParser;

    impl ArgumentParser for EchoParser {
        fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
            Ok(ArgValue::Str(token.text().to_string()))
        }
    }

    fn descriptors(names: &[&[&str]]) -> Vec<Arc<SubCommandDescriptor>> {
        let mut registry = ParserRegistry::new();
        registry.register(ArgType::STRING, EchoParser);
        let specs = names
            .iter()
            .enumerate()
            .map(|(i, variants)| {
                let mut spec = SubCommandSpec::new(
                    format!("h{i}"),
                    FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| {
                        std::future::ready(Outcome::Handled)
                    }),
                );
                for variant in *variants {
                    spec = spec.name(*variant);
                }
                spec
            })
            .collect();
        build_descriptors(
            specs,
            &Permission::new("command.test"),
            &registry,
            &UsageStyle::default(),
        )
        .unwrap()
    }

    fn words(input: &str) -> Vec<Token> {
        input.split_whitespace().map(Token::word).collect()
    }

    #[test]
    fn test_exact_lookup() {
        let descriptors = descriptors(&[&["foo"], &["foo bar"]]);
        let index = NameIndex::build(&descriptors).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.get(&["foo".to_string()]).is_some());
        assert!(index
            .get(&["foo".to_string(), "bar".to_string()])
            .is_some());
        assert!(index.get(&["bar".to_string()]).is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let descriptors = descriptors(&[&["foo"], &["foo bar"]]);
        let index = NameIndex::build(&descriptors).unwrap();

        let (matched, consumed) = index.match_prefix(&words("foo bar baz")).unwrap();
        assert_eq!(matched.primary_name(), "foo bar");
        assert_eq!(consumed, 2);

        let (matched, consumed) = index.match_prefix(&words("foo baz")).unwrap();
        assert_eq!(matched.primary_name(), "foo");
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let descriptors = descriptors(&[&["Foo Bar"]]);
        let index = NameIndex::build(&descriptors).unwrap();
        let (matched, consumed) = index.match_prefix(&words("FOO bAr tail")).unwrap();
        assert_eq!(matched.primary_name(), "foo bar");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_no_match_returns_none() {
        let descriptors = descriptors(&[&["foo"]]);
        let index = NameIndex::build(&descriptors).unwrap();
        assert!(index.match_prefix(&words("bar foo")).is_none());
        assert!(index.match_prefix(&[]).is_none());
    }

    #[test]
    fn test_duplicate_baked_sequence_is_fatal() {
        // Two idents whose variants collapse to the same baked sequence
        // pass per-declaration validation; the index must refuse them.
        let descriptors = descriptors(&[&["foo  bar"], &["Foo Bar"]]);
        let err = NameIndex::build(&descriptors).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateName { name } if name == "foo bar"));
    }

    #[test]
    fn test_prefix_longer_than_any_name_is_capped() {
        let descriptors = descriptors(&[&["a b"]]);
        let index = NameIndex::build(&descriptors).unwrap();
        let (matched, consumed) = index.match_prefix(&words("a b c d e f g")).unwrap();
        assert_eq!(matched.primary_name(), "a b");
        assert_eq!(consumed, 2);
    }
}
