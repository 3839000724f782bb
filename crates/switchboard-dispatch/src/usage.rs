//! Usage text rendering.
//!
//! Each descriptor gets one line:
//! `<prefix><command> <sub-name> <param> ...   <description>`, with the
//! prefix parenthesized when invoking it is optional. The composite usage
//! for a base command is its description, a blank line, then one line per
//! descriptor in registration order. Rendered once at build time and
//! cached on the dispatch table.

use crate::descriptor::{CommandParam, SubCommandDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The host's prefix convention for rendering invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStyle {
    /// Token that introduces a command, e.g. `/`.
    pub prefix: String,
    /// Whether the prefix may be omitted; rendered parenthesized if so.
    pub prefix_optional: bool,
    /// Primary name of the base command for compound commands; `None`
    /// renders sub-names directly after the prefix.
    pub primary: Option<String>,
}

impl Default for UsageStyle {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
            prefix_optional: false,
            primary: None,
        }
    }
}

/// Renders the usage line for one sub-command.
pub(crate) fn render_line(
    name: &str,
    params: &[CommandParam],
    description: &str,
    style: &UsageStyle,
) -> String {
    let mut line = String::new();
    if style.prefix_optional {
        line.push('(');
        line.push_str(&style.prefix);
        line.push(')');
    } else {
        line.push_str(&style.prefix);
    }
    if let Some(primary) = &style.primary {
        line.push_str(primary);
        line.push(' ');
    }
    line.push_str(name);
    for param in params {
        line.push_str(" <");
        line.push_str(&param.name);
        line.push('>');
    }
    line.push_str("   ");
    line.push_str(description);
    line.trim_end().to_string()
}

/// Renders the composite usage for a base command.
///
/// Deterministic: descriptor registration order, leading and trailing
/// blank lines trimmed.
pub fn render_usage(description: &str, descriptors: &[Arc<SubCommandDescriptor>]) -> String {
    let mut out = String::new();
    out.push_str(description);
    out.push('\n');
    out.push('\n');
    for descriptor in descriptors {
        out.push_str(descriptor.usage());
        out.push('\n');
    }
    out.trim().to_string()
}
