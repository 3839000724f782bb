//! Typed argument values and the parser registry interface.
//!
//! The dispatch engine never interprets a parameter's type itself: each
//! [`ArgType`] is only a lookup key into a [`ParserRegistry`] supplied by
//! the host. Parsers turn tokens into [`ArgValue`]s; the engine assembles
//! the results into an ordered [`Args`] list, all-or-nothing.

use crate::message::{Message, Token};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle naming an argument type in the parser registry.
///
/// The router compares and stores these as keys only; what a type *means*
/// is entirely up to the registered parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgType(Cow<'static, str>);

impl ArgType {
    /// Plain string, never fails to parse.
    pub const STRING: ArgType = ArgType(Cow::Borrowed("string"));
    /// Signed 64-bit integer.
    pub const INT: ArgType = ArgType(Cow::Borrowed("int"));
    /// 64-bit float.
    pub const FLOAT: ArgType = ArgType(Cow::Borrowed("float"));
    /// Boolean (`true`/`false`/`yes`/`no`/`on`/`off`/`1`/`0`).
    pub const BOOL: ArgType = ArgType(Cow::Borrowed("bool"));
    /// A rich message element; rejects plain words.
    pub const ELEMENT: ArgType = ArgType(Cow::Borrowed("element"));
    /// Greedy tail: the whole unconsumed remainder as a [`Message`].
    pub const REMAINDER: ArgType = ArgType(Cow::Borrowed("remainder"));

    /// Creates a custom type handle.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The handle's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved argument value produced by a parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A rich element passed through unparsed.
    Element {
        display: String,
        payload: serde_json::Value,
    },
    /// The unconsumed tail, rebuilt as a message.
    Remainder(Message),
}

impl ArgValue {
    /// Returns the string value, if this is [`ArgValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is [`ArgValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float value, if this is [`ArgValue::Float`].
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is [`ArgValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the remainder message, if this is [`ArgValue::Remainder`].
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            ArgValue::Remainder(message) => Some(message),
            _ => None,
        }
    }
}

/// A parse rejection, naming the expected type and the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {input:?} as {expected}")]
pub struct ParseFailure {
    expected: String,
    input: String,
}

impl ParseFailure {
    /// Creates a failure for the given expected type and input form.
    pub fn new(expected: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            input: input.into(),
        }
    }

    /// The type the parser expected.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// The input that was rejected.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Turns tokens into typed values for one [`ArgType`].
pub trait ArgumentParser: Send + Sync {
    /// Parse a single token.
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure>;

    /// Whether this parser consumes the entire remaining tail.
    ///
    /// Only honored when the parameter is in final position; elsewhere the
    /// parser receives single tokens like any other.
    fn consumes_rest(&self) -> bool {
        false
    }

    /// Parse the remaining tail. Called only when [`consumes_rest`] is
    /// true and the parameter is last; `tail` is never empty.
    ///
    /// [`consumes_rest`]: ArgumentParser::consumes_rest
    fn parse_rest(&self, tail: &[Token]) -> Result<ArgValue, ParseFailure> {
        match tail.first() {
            Some(token) => self.parse_token(token),
            None => Err(ParseFailure::new("token", "empty input")),
        }
    }
}

/// Maps [`ArgType`] handles to their parsers.
///
/// Populated by the host before the dispatch table is built; the builder
/// fails fast on any declared parameter whose type has no parser here.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: HashMap<ArgType, Arc<dyn ArgumentParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser for a type handle, replacing any previous one.
    pub fn register(&mut self, ty: ArgType, parser: impl ArgumentParser + 'static) -> &mut Self {
        self.parsers.insert(ty, Arc::new(parser));
        self
    }

    /// Looks up the parser for a type handle.
    pub fn get(&self, ty: &ArgType) -> Option<&Arc<dyn ArgumentParser>> {
        self.parsers.get(ty)
    }

    /// Returns whether a parser is registered for the type handle.
    pub fn contains(&self, ty: &ArgType) -> bool {
        self.parsers.contains_key(ty)
    }

    /// Number of registered parsers.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Returns `true` if no parsers are registered.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("len", &self.parsers.len())
            .finish_non_exhaustive()
    }
}

/// The bound arguments of one resolved call: ordered
/// `(parameter name, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    /// Creates an argument list from resolved pairs.
    pub fn new(values: Vec<(String, ArgValue)>) -> Self {
        Self { values }
    }

    /// Number of bound arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no arguments were bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks up a value by parameter name.
    ///
    /// Returns `None` for parameters that were declared optional and not
    /// supplied.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Looks up a value by position.
    pub fn at(&self, position: usize) -> Option<&ArgValue> {
        self.values.get(position).map(|(_, value)| value)
    }

    /// Iterates over `(parameter name, value)` pairs in positional order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}
