//! Inbound message model and token flattening.
//!
//! A [`Message`] is what a chat transport hands to the dispatcher: plain
//! text interleaved with opaque rich elements (images, mentions, stickers).
//! Before any matching happens the message is flattened into a sequence of
//! [`Token`]s: text is split on spaces, every rich element becomes exactly
//! one token. Both name resolution and argument binding work on that
//! uniform token stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One piece of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text. Split on spaces during flattening; blank pieces dropped.
    Text {
        text: String,
    },
    /// A non-text element. Flattens to a single opaque token; `display` is
    /// the textual form used for comparison and rendering, `payload` is
    /// carried through untouched.
    Element {
        display: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// Creates a rich element segment with an empty payload.
    pub fn element(display: impl Into<String>) -> Self {
        Segment::Element {
            display: display.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Creates a rich element segment carrying a transport payload.
    pub fn element_with_payload(display: impl Into<String>, payload: serde_json::Value) -> Self {
        Segment::Element {
            display: display.into(),
            payload,
        }
    }
}

/// An ordered sequence of [`Segment`]s as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    segments: Vec<Segment>,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message holding a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::text(text)],
        }
    }

    /// Rebuilds a message from a token slice.
    ///
    /// Used for the greedy tail of argument binding and for handing the
    /// unconsumed remainder to a default handler. Flattening the result
    /// yields the same token sequence back.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let segments = tokens
            .iter()
            .map(|token| match token {
                Token::Word(word) => Segment::text(word.clone()),
                Token::Element { display, payload } => {
                    Segment::element_with_payload(display.clone(), payload.clone())
                }
            })
            .collect();
        Self { segments }
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Returns the segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the message holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::text(text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match segment {
                Segment::Text { text } => f.write_str(text)?,
                Segment::Element { display, .. } => f.write_str(display)?,
            }
        }
        Ok(())
    }
}

/// An atomic unit of a flattened message: a word of text or one opaque
/// rich element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Word(String),
    Element {
        display: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl Token {
    /// Creates a word token.
    pub fn word(word: impl Into<String>) -> Self {
        Token::Word(word.into())
    }

    /// The textual form used for matching and display.
    pub fn text(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Element { display, .. } => display,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Flattens a message into its token sequence.
///
/// Pure and total: text segments are split on the space character with
/// blank pieces dropped, rich elements pass through as single tokens.
pub fn flatten(message: &Message) -> Vec<Token> {
    let mut tokens = Vec::new();
    for segment in message.segments() {
        match segment {
            Segment::Text { text } => {
                tokens.extend(
                    text.split(' ')
                        .filter(|piece| !piece.chars().all(char::is_whitespace))
                        .map(Token::word),
                );
            }
            Segment::Element { display, payload } => tokens.push(Token::Element {
                display: display.clone(),
                payload: payload.clone(),
            }),
        }
    }
    tokens
}
