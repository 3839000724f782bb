//! Built-in argument parsers.
//!
//! Hosts that need richer types (durations, user references, …) register
//! their own [`ArgumentParser`] under a custom [`ArgType`]; these cover
//! the common cases and back the well-known `ArgType` constants.

use switchboard_dispatch::{
    ArgType, ArgValue, ArgumentParser, Message, ParseFailure, ParserRegistry, Token,
};

/// Accepts any token; rich elements contribute their display form.
pub struct StringParser;

impl ArgumentParser for StringParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        Ok(ArgValue::Str(token.text().to_string()))
    }
}

/// Parses a signed 64-bit integer.
pub struct IntParser;

impl ArgumentParser for IntParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        token
            .text()
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| ParseFailure::new("int", token.text()))
    }
}

/// Parses a 64-bit float.
pub struct FloatParser;

impl ArgumentParser for FloatParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        token
            .text()
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|_| ParseFailure::new("float", token.text()))
    }
}

/// Parses a boolean: `true`/`yes`/`on`/`1` and `false`/`no`/`off`/`0`,
/// case-insensitive.
pub struct BoolParser;

impl ArgumentParser for BoolParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        match token.text().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(ArgValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(ParseFailure::new("bool", token.text())),
        }
    }
}

/// Requires a rich element token and passes it through unparsed.
pub struct ElementParser;

impl ArgumentParser for ElementParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        match token {
            Token::Element { display, payload } => Ok(ArgValue::Element {
                display: display.clone(),
                payload: payload.clone(),
            }),
            Token::Word(word) => Err(ParseFailure::new("element", word.as_str())),
        }
    }
}

/// Greedy tail: the whole unconsumed remainder as a [`Message`].
///
/// In any position but the last it degrades to a single-token message.
pub struct RemainderParser;

impl ArgumentParser for RemainderParser {
    fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
        Ok(ArgValue::Remainder(Message::from_tokens(
            std::slice::from_ref(token),
        )))
    }

    fn consumes_rest(&self) -> bool {
        true
    }

    fn parse_rest(&self, tail: &[Token]) -> Result<ArgValue, ParseFailure> {
        Ok(ArgValue::Remainder(Message::from_tokens(tail)))
    }
}

/// A registry with every built-in parser wired to its well-known
/// [`ArgType`] handle.
pub fn default_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(ArgType::STRING, StringParser);
    registry.register(ArgType::INT, IntParser);
    registry.register(ArgType::FLOAT, FloatParser);
    registry.register(ArgType::BOOL, BoolParser);
    registry.register(ArgType::ELEMENT, ElementParser);
    registry.register(ArgType::REMAINDER, RemainderParser);
    registry
}
